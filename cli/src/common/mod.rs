//! # Echelon Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared building blocks that know nothing about items or result records:
//!
//! - **`fs`**: text reads and writes (lossy output-file reads, batch input,
//!   result documents).
//! - **`process`**: spawning one child process with piped streams and
//!   collecting its output.
//!
//! The item-level logic that combines them lives in `crate::pipeline`.
//!

/// Utilities for filesystem operations.
pub mod fs;
/// Spawning external programs and capturing their output.
pub mod process;
