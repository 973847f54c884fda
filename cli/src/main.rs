//! # Echelon Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Echelon runs external programs, captures their stdout/stderr and harvests
//! the output file each program was told to write, turning everything into
//! JSON result records. This file handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the `run` or `batch` handler
//!
//! ## Architecture
//!
//! - `commands`: CLI surface (`run`, `batch`) and shared execution flags
//! - `pipeline`: per-item argument building, execution, harvesting
//! - `common`: process spawning and filesystem helpers
//! - `core`: configuration and error types
//!
//! Logs go to stderr so stdout carries only the JSON records.
//!
//! ## Examples
//!
//! ```bash
//! # Run one program
//! echelon run echo -a -n=hello
//!
//! # Run a list of items with debug logging
//! echelon -vv batch items.json
//! ```
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // CLI commands (run, batch)
mod common; // Process and filesystem utilities
mod core; // Configuration and errors
mod pipeline; // Item pipeline: args, process, harvest

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "echelon",
    about = "Run external programs and harvest their output as JSON records",
    long_about = "Runs external programs, captures stdout/stderr, and parses the output file \
                  each program writes (JSON, JSON lines or text lines) into result records.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Enum defining all available top-level commands.
#[derive(Parser, Debug)]
enum Commands {
    #[command(alias = "r")]
    Run(commands::run::RunArgs),
    #[command(alias = "b")]
    Batch(commands::batch::BatchArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Run(args) => commands::run::handle_run(args).await,
        Commands::Batch(args) => commands::batch::handle_batch(args).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
