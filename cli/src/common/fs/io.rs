//! # Echelon Filesystem I/O Operations
//!
//! File: cli/src/common/fs/io.rs
//!
//! ## Overview
//!
//! Small wrappers around `std::fs` used in three places:
//!
//! - **`read_text_lossy`**: reads a file written by a child process. Child
//!   programs do not promise valid UTF-8, so invalid sequences are replaced
//!   rather than failing the read. The raw `std::io::Error` is returned so the
//!   harvester can tell "not found" apart from other failures.
//! - **`read_input`**: reads batch item input from a file, or from stdin when
//!   no file (or `-`) is given.
//! - **`write_string_to_file`**: writes a result document, creating missing
//!   parent directories first via `ensure_dir_exists`.
//!
use crate::core::error::{EchelonError, Result};
use anyhow::Context;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Reads a whole file as text, replacing invalid UTF-8 sequences.
pub fn read_text_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    debug!("Read {} bytes from {:?}", bytes.len(), path);
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Reads item input from `source`, or from stdin when `source` is `None` or `-`.
pub fn read_input(source: Option<&Path>) -> Result<String> {
    match source {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {:?}", path)),
        _ => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read input from stdin")?;
            Ok(content)
        }
    }
}

/// Creates `path` (and parents) unless it already exists as a directory.
///
/// # Errors
///
/// Fails if `path` exists but is not a directory, or if creation fails.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        anyhow::bail!(EchelonError::FileSystem(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    }
    Ok(())
}

/// Writes `content` to `path`, overwriting it and creating parent directories.
pub fn write_string_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir_exists(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write to file {:?}", path))?;
    info!("Wrote results to file: {:?}", path);
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_text_lossy_replaces_invalid_utf8() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("binary.out");
        fs::write(&path, [b'o', b'k', 0xff, b'\n'])?;

        let text = read_text_lossy(&path)?;
        assert_eq!(text, "ok\u{fffd}\n");
        Ok(())
    }

    #[test]
    fn test_read_text_lossy_reports_not_found() -> Result<()> {
        let dir = tempdir()?;
        let err = read_text_lossy(&dir.path().join("missing.out")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        Ok(())
    }

    #[test]
    fn test_read_input_from_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("items.json");
        fs::write(&path, "[]")?;
        assert_eq!(read_input(Some(&path))?, "[]");
        Ok(())
    }

    #[test]
    fn test_write_creates_parent_directories() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("results/nested/run.json");
        write_string_to_file(&path, "[]")?;
        assert_eq!(fs::read_to_string(&path)?, "[]");
        Ok(())
    }

    #[test]
    fn test_ensure_dir_exists_path_is_file() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("a_file.txt");
        fs::write(&file_path, "hello")?;

        let result = ensure_dir_exists(&file_path);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Path exists but is not a directory"));
        Ok(())
    }
}
