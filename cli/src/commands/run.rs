//! # Echelon Run Command
//!
//! File: cli/src/commands/run.rs
//!
//! ## Overview
//!
//! `echelon run` executes a single item whose program, arguments and parse
//! modes come from command-line flags, then prints the one-record result
//! array.
//!
//! ```bash
//! # Plain execution, streams captured
//! echelon run echo -a -n=hello
//!
//! # Let the program write its report to the generated output file and
//! # parse it as JSON
//! echelon run nuclei -a -u=https://example.com -a -jsonl -a -o=FILENAME --parse-json-lines
//!
//! # Feed stdin
//! echelon run sort --stdin "$(printf 'b\na\n')"
//! ```
//!
//! Each `-a/--arg` is `PARAMETER` or `PARAMETER=VALUE`, split at the first `=`.
//!
use super::ExecOptions;
use crate::common::fs::io;
use crate::core::error::Result;
use crate::pipeline::{self, item::ArgumentPair, item::ItemSpec};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

/// # Run Arguments (`RunArgs`)
#[derive(Parser, Debug)]
#[command(
    about = "Run one program and print its result record",
    long_about = "Runs PROGRAM with the given arguments, captures stdout/stderr, optionally \
                  parses the generated output file, and prints the result as JSON."
)]
pub struct RunArgs {
    /// Program to execute.
    pub program: String,

    /// Argument as `PARAMETER` or `PARAMETER=VALUE`. Repeatable; order is kept.
    /// The placeholder (default `FILENAME`) is replaced by the output file path.
    #[arg(
        short = 'a',
        long = "arg",
        value_name = "PARAMETER[=VALUE]",
        allow_hyphen_values = true,
        value_parser = parse_argument_pair
    )]
    pub args: Vec<ArgumentPair>,

    /// Parse the output file as one JSON document.
    #[arg(long)]
    pub parse_json: bool,

    /// Parse the output file as JSON lines.
    #[arg(long)]
    pub parse_json_lines: bool,

    /// Split the output file into text lines.
    #[arg(long)]
    pub parse_text_lines: bool,

    /// Text written to the program's stdin.
    #[arg(long, value_name = "TEXT", conflicts_with = "stdin_file")]
    pub stdin: Option<String>,

    /// File whose content is written to the program's stdin.
    #[arg(long, value_name = "PATH")]
    pub stdin_file: Option<PathBuf>,

    #[command(flatten)]
    pub exec: ExecOptions,
}

/// Splits `PARAMETER=VALUE` at the first `=`.
fn parse_argument_pair(raw: &str) -> std::result::Result<ArgumentPair, String> {
    fn non_empty(s: &str) -> Option<&str> {
        (!s.is_empty()).then_some(s)
    }
    Ok(match raw.split_once('=') {
        Some((parameter, value)) => ArgumentPair::new(non_empty(parameter), non_empty(value)),
        None => ArgumentPair::new(non_empty(raw), None),
    })
}

impl RunArgs {
    fn to_item(&self) -> Result<ItemSpec> {
        let stdin_content = match (&self.stdin, &self.stdin_file) {
            (Some(text), _) => Some(text.clone()),
            (None, Some(path)) => Some(io::read_input(Some(path))?),
            (None, None) => None,
        };
        Ok(ItemSpec {
            program: self.program.clone(),
            arguments: self.args.clone(),
            parse_json: self.parse_json,
            parse_json_lines: self.parse_json_lines,
            parse_text_lines: self.parse_text_lines,
            use_stdin: stdin_content.is_some(),
            stdin_content,
        })
    }
}

/// # Handle Run Command (`handle_run`)
///
/// Builds one item from the flags, runs it through the pipeline and prints
/// the result. Fails if the program cannot be started or exits unsuccessfully.
pub async fn handle_run(args: RunArgs) -> Result<()> {
    info!("Handling run command...");
    debug!("Run args: {:?}", args);

    let item = args.to_item()?;
    let (ctx, settings) = super::prepare(&args.exec)?;
    let records = pipeline::run_items(std::slice::from_ref(&item), &ctx, &settings).await?;
    super::emit(&records, &args.exec)
}
