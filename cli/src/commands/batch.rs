//! # Echelon Batch Command
//!
//! File: cli/src/commands/batch.rs
//!
//! ## Overview
//!
//! `echelon batch` reads items from a file (or stdin) and runs them in order,
//! printing one result record per item as a JSON array.
//!
//! Input is either a JSON array of items or one item object per line:
//!
//! ```json
//! [
//!   { "program": "echo", "arguments": [{ "parameter": "-n", "value": "hello" }] },
//!   { "program": "sh",
//!     "arguments": [{ "parameter": "-c", "value": "date -u +%s > \"$0\"" }, { "value": "FILENAME" }],
//!     "parseTextLines": true }
//! ]
//! ```
//!
//! If any item's process fails, nothing is printed and the command exits
//! with an error naming the failing item.
//!
use super::ExecOptions;
use crate::common::fs::io;
use crate::core::error::{EchelonError, Result};
use crate::pipeline::{self, item::ItemSpec};
use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

/// # Batch Arguments (`BatchArgs`)
#[derive(Parser, Debug)]
#[command(
    about = "Run a list of items and print their result records",
    long_about = "Reads a JSON array of items (or one JSON item per line) from FILE or stdin, \
                  runs them one after another and prints the ordered result records."
)]
pub struct BatchArgs {
    /// Item file. Reads stdin when omitted or `-`.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub exec: ExecOptions,
}

/// Parses batch input: a JSON array, or JSON lines of item objects.
pub fn parse_items(content: &str) -> Result<Vec<ItemSpec>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| {
            anyhow!(EchelonError::ArgumentParsing(format!(
                "Invalid item array: {}",
                e
            )))
        });
    }
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                anyhow!(EchelonError::ArgumentParsing(format!(
                    "Invalid item on line {}: {}",
                    index + 1,
                    e
                )))
            })
        })
        .collect()
}

/// # Handle Batch Command (`handle_batch`)
///
/// Reads and parses the items, runs them through the pipeline and prints the
/// records.
pub async fn handle_batch(args: BatchArgs) -> Result<()> {
    info!("Handling batch command...");
    debug!("Batch args: {:?}", args);

    let content = io::read_input(args.input.as_deref())?;
    let items = parse_items(&content).context("Failed to parse batch input")?;
    info!("Loaded {} item(s)", items.len());

    let (ctx, settings) = super::prepare(&args.exec)?;
    let records = pipeline::run_items(&items, &ctx, &settings).await?;
    super::emit(&records, &args.exec)
}
