//! # Output Path Generation
//!
//! File: cli/src/pipeline/output_path.rs
//!
//! Each item gets its own output file path,
//! `<dir>/<prefix>-<unix millis>-<random base36>.<extension>`. The file is not
//! created here; the child program is expected to write it, and Echelon never
//! deletes it.
//!
//! Timestamp plus random suffix makes collisions unlikely; the generator also
//! remembers every path it has handed out and draws again on a repeat, so
//! paths never repeat within one invocation.
//!
use chrono::Utc;
use rand::Rng;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LEN: usize = 6;

/// Hands out unique output file paths under one directory.
#[derive(Debug)]
pub struct OutputPathGenerator {
    directory: PathBuf,
    prefix: String,
    extension: String,
    issued: HashSet<PathBuf>,
}

impl OutputPathGenerator {
    pub fn new(directory: impl Into<PathBuf>, prefix: &str, extension: &str) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.to_string(),
            extension: extension.to_string(),
            issued: HashSet::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns a path not returned before by this generator.
    pub fn next_path(&mut self) -> PathBuf {
        loop {
            let name = file_name(
                &self.prefix,
                Utc::now().timestamp_millis(),
                &random_token(),
                &self.extension,
            );
            let path = self.directory.join(name);
            if self.issued.insert(path.clone()) {
                return path;
            }
            debug!("Output path {:?} already issued, drawing again", path);
        }
    }
}

fn file_name(prefix: &str, millis: i64, token: &str, extension: &str) -> String {
    if extension.is_empty() {
        format!("{}-{}-{}", prefix, millis, token)
    } else {
        format!("{}-{}-{}.{}", prefix, millis, token, extension)
    }
}

/// Lowercase base36 string of `TOKEN_LEN` characters.
fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            file_name("output", 1700000000000, "k3j9xq", "out"),
            "output-1700000000000-k3j9xq.out"
        );
        assert_eq!(file_name("scan", 5, "abc123", ""), "scan-5-abc123");
    }

    #[test]
    fn test_random_token_alphabet() {
        let token = random_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_paths_live_under_directory() {
        let mut generator = OutputPathGenerator::new("/work/scans", "output", "out");
        let path = generator.next_path();
        assert_eq!(path.parent(), Some(Path::new("/work/scans")));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("output-"));
        assert!(name.ends_with(".out"));
        assert_eq!(name.split('-').count(), 3);
    }

    #[test]
    fn test_paths_never_repeat_within_generator() {
        let mut generator = OutputPathGenerator::new("/work", "output", "out");
        let paths: HashSet<PathBuf> = (0..2000).map(|_| generator.next_path()).collect();
        assert_eq!(paths.len(), 2000);
    }
}
