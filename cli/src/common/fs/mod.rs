//! # Echelon Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//!
//! ## Overview
//!
//! Filesystem helpers shared by the commands and the output harvester.
//!
//! - **`io`**: lossy text reads for harvested output files, reading item input
//!   from a file or stdin, and writing result documents (creating parent
//!   directories as needed).
//!
//! ```rust
//! use crate::common::fs::io;
//!
//! let content = io::read_text_lossy(Path::new("/tmp/output-1700000000000-k3j9x.out"))?;
//! io::write_string_to_file(Path::new("results/run.json"), &content)?;
//! ```
//!

/// Text reads and writes used by harvesting and the CLI commands.
pub mod io;
