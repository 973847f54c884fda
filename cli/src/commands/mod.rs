//! # Echelon Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! The top-level commands of the Echelon CLI and the options they share.
//!
//! - `run`: execute one program described by command-line flags
//! - `batch`: execute a list of items read from a JSON file or stdin
//!
//! Both commands funnel into `pipeline::run_items` and print the resulting
//! records as a JSON array. The shared `ExecOptions` flags override values
//! from the configuration files.
//!
use crate::common::fs::io;
use crate::common::process::ExecContext;
use crate::core::config::{self, Config, SubstitutionStyle};
use crate::core::error::Result;
use crate::pipeline::{item::RunResult, PipelineSettings};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

/// Runs a list of items read from a file or stdin.
pub mod batch;
/// Runs a single item described on the command line.
pub mod run;

/// # Execution Options (`ExecOptions`)
///
/// Flags accepted by every command that runs items. Each one overrides the
/// matching configuration value when given.
#[derive(Args, Debug, Clone, Default)]
pub struct ExecOptions {
    /// Run the command line through the configured shell. Shell
    /// metacharacters in the program and arguments become live.
    #[arg(long)]
    pub shell: bool,

    /// Directory the programs run in and output files are created under.
    #[arg(short = 'C', long = "working-dir", value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Per-stream limit on captured stdout/stderr bytes (0 = unlimited).
    #[arg(long, value_name = "BYTES")]
    pub max_capture_bytes: Option<usize>,

    /// Token replaced by the output file path in arguments.
    #[arg(long, value_name = "TOKEN")]
    pub placeholder: Option<String>,

    /// Replace the placeholder inside arguments instead of replacing the
    /// whole argument.
    #[arg(long)]
    pub substring: bool,

    /// Write the JSON records to FILE instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print compact instead of pretty JSON.
    #[arg(long)]
    pub compact: bool,
}

impl ExecOptions {
    fn apply_to(&self, cfg: &mut Config) {
        if self.shell {
            cfg.execution.use_shell = true;
        }
        if let Some(dir) = &self.working_dir {
            let dir = dir.to_string_lossy();
            cfg.execution.working_directory = Some(shellexpand::tilde(&dir).into_owned());
        }
        if let Some(max_bytes) = self.max_capture_bytes {
            cfg.capture.max_bytes = max_bytes;
        }
        if let Some(token) = &self.placeholder {
            cfg.placeholder.token = token.clone();
        }
        if self.substring {
            cfg.placeholder.substitution = SubstitutionStyle::Substring;
        }
    }
}

/// Loads configuration, applies the command-line overrides and builds the
/// execution context and pipeline settings for this invocation.
pub fn prepare(options: &ExecOptions) -> Result<(ExecContext, PipelineSettings)> {
    let mut cfg = config::load_config().context("Failed to load Echelon configuration")?;
    options.apply_to(&mut cfg);
    config::validate_config(&cfg).context("Invalid command-line overrides")?;
    debug!("Effective configuration: {:?}", cfg);

    let mut ctx = ExecContext::from_process()?;
    if let Some(dir) = &cfg.execution.working_directory {
        ctx = ctx.with_working_directory(dir);
    }
    Ok((ctx, PipelineSettings::from_config(&cfg)))
}

/// Prints (or writes) the records as a JSON array.
pub fn emit(records: &[RunResult], options: &ExecOptions) -> Result<()> {
    let rendered = if options.compact {
        serde_json::to_string(records)
    } else {
        serde_json::to_string_pretty(records)
    }
    .context("Failed to serialize result records")?;

    match &options.output {
        Some(path) => io::write_string_to_file(path, &(rendered + "\n")),
        None => {
            println!("{}", rendered);
            Ok(())
        }
    }
}
