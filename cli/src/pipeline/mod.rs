//! # Echelon Item Pipeline
//!
//! File: cli/src/pipeline/mod.rs
//!
//! ## Overview
//!
//! Runs a list of items one after another. For each item:
//!
//! 1. **Arguments built**: a fresh output path is drawn and substituted into
//!    the argument list (`args`, `output_path`).
//! 2. **Process ran**: the program is executed and its streams captured
//!    (`common::process`).
//! 3. **Output harvested** for each requested parse mode (`harvest`), or
//!    skipped when none were requested.
//! 4. **Appended**: the item's `RunResult` joins the output collection.
//!
//! Items never overlap: item N+1 is not started before item N's record has
//! been appended, so an output file is only ever read after its own process
//! exited.
//!
//! ## Failure policy
//!
//! - Invalid items are rejected before any process runs.
//! - A process failure (spawn failure, non-zero exit) aborts the whole run;
//!   no records are returned.
//! - Harvest problems are recorded on the item's record and the run goes on.
//!
//! ## Usage
//!
//! ```rust
//! let ctx = ExecContext::from_process()?;
//! let settings = PipelineSettings::from_config(&config::load_config()?);
//! let records = pipeline::run_items(&items, &ctx, &settings).await?;
//! println!("{}", serde_json::to_string_pretty(&records)?);
//! ```
//!
pub mod args;
pub mod harvest;
pub mod item;
pub mod output_path;

use crate::common::process::{self, ExecContext, Invocation, ProcessRequest};
use crate::core::config::{Config, SubstitutionStyle};
use crate::core::error::{EchelonError, Result};
use anyhow::{anyhow, Context};
use args::Placeholder;
use item::{ItemSpec, RunResult};
use output_path::OutputPathGenerator;
use std::path::PathBuf;
use tracing::{debug, info};

/// Resolved, per-invocation settings shared by every item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub invocation: Invocation,
    pub max_capture_bytes: Option<usize>,
    pub placeholder_token: String,
    pub substitution: SubstitutionStyle,
    pub output_prefix: String,
    pub output_extension: String,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        let invocation = if config.execution.use_shell {
            Invocation::Shell {
                interpreter: config.execution.shell.clone(),
            }
        } else {
            Invocation::Direct
        };
        Self {
            invocation,
            max_capture_bytes: capture_limit(config.capture.max_bytes),
            placeholder_token: config.placeholder.token.clone(),
            substitution: config.placeholder.substitution,
            output_prefix: config.output_file.prefix.clone(),
            output_extension: config.output_file.extension.clone(),
        }
    }

    fn placeholder(&self) -> Placeholder<'_> {
        Placeholder {
            token: &self.placeholder_token,
            style: self.substitution,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Maps the configured byte cap to a limit, `0` meaning unlimited.
pub fn capture_limit(max_bytes: usize) -> Option<usize> {
    (max_bytes > 0).then_some(max_bytes)
}

/// Runs every item in order and returns one record per item.
///
/// # Errors
///
/// Returns the first item validation error or process failure, with the
/// item's index as context. No partial results are returned.
pub async fn run_items(
    items: &[ItemSpec],
    ctx: &ExecContext,
    settings: &PipelineSettings,
) -> Result<Vec<RunResult>> {
    for (index, item) in items.iter().enumerate() {
        item.validate()
            .with_context(|| format!("Item {} rejected", index))?;
    }

    let mut paths = OutputPathGenerator::new(
        absolute_dir(ctx)?,
        &settings.output_prefix,
        &settings.output_extension,
    );
    debug!("Output files for this run go to {}", paths.directory().display());

    let mut results = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let result = run_item(index, item, ctx, settings, &mut paths)
            .await
            .with_context(|| format!("Item {} ({}) failed", index, item.program))?;
        results.push(result);
        debug!("Item {}: appended", index);
    }
    info!("Processed {} item(s)", results.len());
    Ok(results)
}

async fn run_item(
    index: usize,
    item: &ItemSpec,
    ctx: &ExecContext,
    settings: &PipelineSettings,
    paths: &mut OutputPathGenerator,
) -> Result<RunResult> {
    let output_path = paths.next_path();
    let output_path_text = output_path.to_string_lossy().into_owned();
    let built = args::build_arguments(
        &item.program,
        &item.arguments,
        settings.placeholder(),
        &output_path_text,
    );
    debug!("Item {}: arguments built: {:?}", index, built.args);

    info!("Item {}: running {}", index, built.command_line);
    let stdin = item.stdin_payload();
    let request = ProcessRequest {
        program: &item.program,
        args: &built.args,
        command_line: &built.command_line,
        stdin,
        invocation: &settings.invocation,
        max_capture_bytes: settings.max_capture_bytes,
    };
    let output = process::run_process(ctx, &request).await?;
    debug!(
        "Item {}: process ran ({} stdout bytes, {} stderr bytes)",
        index,
        output.stdout.len(),
        output.stderr.len()
    );

    let mut result = RunResult {
        command: built.command_line,
        stdout: output.stdout,
        stderr: output.stderr,
        output_path: output_path_text,
        stdin: stdin.map(str::to_string),
        ..Default::default()
    };

    let modes = item.parse_modes();
    if modes.is_empty() {
        debug!("Item {}: no parse modes requested, harvest skipped", index);
    } else {
        harvest::harvest_into(&mut result, &output_path, &modes);
        debug!("Item {}: output harvested for {:?}", index, modes);
    }
    Ok(result)
}

fn absolute_dir(ctx: &ExecContext) -> Result<PathBuf> {
    if ctx.working_directory.is_absolute() {
        return Ok(ctx.working_directory.clone());
    }
    let cwd = std::env::current_dir().map_err(|e| {
        anyhow!(EchelonError::FileSystem(format!(
            "Failed to get current directory: {}",
            e
        )))
    })?;
    Ok(cwd.join(&ctx.working_directory))
}
