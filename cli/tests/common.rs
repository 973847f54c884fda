//! # Echelon CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Every test runs
//! the compiled `echelon` binary inside its own temporary directory with an
//! empty configuration file, so user or project configuration on the test
//! machine cannot leak in.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

/// Creates an isolated working directory containing an empty config file.
pub fn sandbox() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("config.toml"), "").expect("Failed to write config");
    std::fs::create_dir(dir.path().join(".git")).expect("Failed to create .git marker");
    dir
}

/// An `echelon` command running in `dir` and reading `dir/config.toml`.
pub fn echelon_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("echelon").expect("Failed to find echelon binary for testing");
    cmd.current_dir(dir)
        .env("ECHELON_CONFIG", dir.join("config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

/// Parses a successful run's stdout as the JSON record array.
pub fn records(stdout: &[u8]) -> Vec<serde_json::Value> {
    serde_json::from_slice(stdout).expect("stdout is not a JSON array of records")
}
