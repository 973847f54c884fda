//! # Echelon Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout Echelon. Errors fall
//! into two groups with very different propagation rules:
//!
//! - **Fatal** errors abort the whole invocation: the child process could not
//!   be started, it exited unsuccessfully, its pipes failed, or the
//!   configuration / item input was invalid. These are `EchelonError` values
//!   carried inside an `anyhow::Error`.
//! - **Harvest** problems (missing output file, malformed JSON) are never
//!   errors at this level. They are recorded on the item's result record by
//!   the harvester and processing moves on.
//!
//! ## Architecture
//!
//! - `EchelonError`: a `thiserror` enum of the fatal failure kinds.
//! - `Result<T>`: alias for `anyhow::Result<T>` so call sites can add context
//!   with `.context(...)` / `.with_context(...)`.
//!
//! ## Examples
//!
//! ```rust
//! // Return a specific error type
//! return Err(anyhow!(EchelonError::InvalidItem("program must not be empty".into())));
//!
//! // Inspect the error kind at the top level
//! if let Some(EchelonError::ExternalCommand { stderr, .. }) = err.downcast_ref::<EchelonError>() {
//!     eprintln!("child said: {stderr}");
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for the Echelon application.
#[derive(Error, Debug)]
pub enum EchelonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filesystem error: {0}")]
    FileSystem(String),

    #[error("Failed to start process '{command}': {message}")]
    Spawn { command: String, message: String },

    #[error("Command failed: {cmd}, Status: {status}, Stderr:\n{stderr}")]
    ExternalCommand {
        cmd: String,
        status: String,
        stderr: String,
    },

    #[error("Process I/O error: {0}")]
    Io(String),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Argument parsing error: {0}")]
    ArgumentParsing(String),
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
