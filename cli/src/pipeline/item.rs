//! # Items and Result Records
//!
//! File: cli/src/pipeline/item.rs
//!
//! ## Overview
//!
//! The typed boundary of the pipeline. `ItemSpec` is what a caller supplies
//! per item (deserialized from camelCase JSON and validated before anything
//! runs); `RunResult` is the record produced per item and serialized back out
//! as camelCase JSON.
//!
//! ```json
//! {
//!   "program": "nmap",
//!   "arguments": [
//!     { "parameter": "-oX", "value": "FILENAME" },
//!     { "parameter": "scanme.nmap.org" }
//!   ],
//!   "parseTextLines": true
//! }
//! ```
//!
use crate::core::error::{EchelonError, Result};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `(parameter, value)` pair of an item's argument list.
///
/// A missing or empty `parameter` is not emitted; a missing or empty `value`
/// leaves the parameter as a bare flag.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ArgumentPair {
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ArgumentPair {
    pub fn new(parameter: Option<&str>, value: Option<&str>) -> Self {
        Self {
            parameter: parameter.map(str::to_string),
            value: value.map(str::to_string),
        }
    }
}

/// Output file decodings an item can ask for.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ParseMode {
    Json,
    JsonLines,
    TextLines,
}

/// Everything needed to run and harvest one item.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemSpec {
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub arguments: Vec<ArgumentPair>,
    #[serde(default)]
    pub parse_json: bool,
    #[serde(default, alias = "parseJsonL")]
    pub parse_json_lines: bool,
    #[serde(default, alias = "parseTextL")]
    pub parse_text_lines: bool,
    #[serde(default)]
    pub use_stdin: bool,
    #[serde(default)]
    pub stdin_content: Option<String>,
}

impl ItemSpec {
    /// Rejects items that cannot be run.
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(anyhow!(EchelonError::InvalidItem(
                "program must not be empty".to_string()
            )));
        }
        Ok(())
    }

    /// Requested parse modes, in harvesting order.
    pub fn parse_modes(&self) -> Vec<ParseMode> {
        [
            (self.parse_json, ParseMode::Json),
            (self.parse_json_lines, ParseMode::JsonLines),
            (self.parse_text_lines, ParseMode::TextLines),
        ]
        .into_iter()
        .filter_map(|(enabled, mode)| enabled.then_some(mode))
        .collect()
    }

    /// Stdin payload, if the item asked for stdin. Missing content is empty input.
    pub fn stdin_payload(&self) -> Option<&str> {
        self.use_stdin
            .then(|| self.stdin_content.as_deref().unwrap_or(""))
    }
}

/// Why the output file could not be harvested, and for which modes.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputFileError {
    pub path: String,
    pub reason: String,
    pub modes: Vec<ParseMode>,
}

/// The record produced for one item.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file_json_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_parsing_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file_json_lines_data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file_text_lines_data: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_output_file: Option<OutputFileError>,
}
