//! # Output Harvester
//!
//! File: cli/src/pipeline/harvest.rs
//!
//! ## Overview
//!
//! Reads an item's output file after its process has exited and decodes it
//! according to each requested `ParseMode`. Nothing in here can fail the
//! invocation: every problem ends up as a field on the item's `RunResult`.
//!
//! | Mode        | Success field                 | Problem                               |
//! |-------------|-------------------------------|---------------------------------------|
//! | `Json`      | `outputFileJsonData`          | `errorParsingJson` (decoder message)  |
//! | `JsonLines` | `outputFileJsonLinesData`     | bad lines silently dropped            |
//! | `TextLines` | `outputFileTextLinesData`     | none                                  |
//! | any         |                               | `errorOutputFile` if unreadable       |
//!
//! The file is read once per requested mode.
//!
use super::item::{OutputFileError, ParseMode, RunResult};
use crate::common::fs::io;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Outcome of harvesting one mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Harvested {
    JsonData(Value),
    JsonParseError(String),
    JsonLines(Vec<Value>),
    TextLines(Vec<String>),
    FileUnavailable { reason: String },
}

/// Reads `path` and decodes it for `mode`.
pub fn harvest(path: &Path, mode: ParseMode) -> Harvested {
    let content = match io::read_text_lossy(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Output file {:?} does not exist ({:?})", path, mode);
            return Harvested::FileUnavailable {
                reason: "file not found".to_string(),
            };
        }
        Err(e) => {
            warn!("Output file {:?} could not be read: {}", path, e);
            return Harvested::FileUnavailable {
                reason: e.to_string(),
            };
        }
    };

    match mode {
        ParseMode::Json => match serde_json::from_str(&content) {
            Ok(value) => Harvested::JsonData(value),
            Err(e) => {
                debug!("Output file {:?} is not valid JSON: {}", path, e);
                Harvested::JsonParseError(e.to_string())
            }
        },
        ParseMode::JsonLines => Harvested::JsonLines(parse_json_lines(&content)),
        ParseMode::TextLines => Harvested::TextLines(split_text_lines(&content)),
    }
}

/// Parses each non-blank line as JSON, dropping lines that do not parse.
pub fn parse_json_lines(content: &str) -> Vec<Value> {
    content
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Dropping JSON line {}: {}", index + 1, e);
                None
            }
        })
        .collect()
}

/// Splits on `\n` verbatim; a trailing newline yields a trailing empty line.
pub fn split_text_lines(content: &str) -> Vec<String> {
    content.split('\n').map(str::to_string).collect()
}

/// Harvests every mode in `modes` into `result`.
pub fn harvest_into(result: &mut RunResult, path: &Path, modes: &[ParseMode]) {
    for &mode in modes {
        match harvest(path, mode) {
            Harvested::JsonData(value) => result.output_file_json_data = Some(value),
            Harvested::JsonParseError(message) => result.error_parsing_json = Some(message),
            Harvested::JsonLines(values) => result.output_file_json_lines_data = Some(values),
            Harvested::TextLines(lines) => result.output_file_text_lines_data = Some(lines),
            Harvested::FileUnavailable { reason } => match result.error_output_file.as_mut() {
                Some(existing) => existing.modes.push(mode),
                None => {
                    result.error_output_file = Some(OutputFileError {
                        path: path.to_string_lossy().into_owned(),
                        reason,
                        modes: vec![mode],
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_json_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, r#"{"a":1}"#).unwrap();
        assert_eq!(harvest(&path, ParseMode::Json), Harvested::JsonData(json!({"a": 1})));
    }

    #[test]
    fn test_malformed_json_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "{\"a\":").unwrap();
        match harvest(&path, ParseMode::Json) {
            Harvested::JsonParseError(message) => assert!(!message.is_empty()),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_lines_drop_blank_and_malformed() {
        let values = parse_json_lines("{\"x\":1}\n\nnot-json\n{\"x\":2}");
        assert_eq!(values, vec![json!({"x": 1}), json!({"x": 2})]);
    }

    #[test]
    fn test_json_lines_tolerate_crlf() {
        let values = parse_json_lines("{\"x\":1}\r\n{\"x\":2}\r\n");
        assert_eq!(values, vec![json!({"x": 1}), json!({"x": 2})]);
    }

    #[test]
    fn test_text_lines_keep_trailing_empty_line() {
        assert_eq!(split_text_lines("a\nb\n"), vec!["a", "b", ""]);
        assert_eq!(split_text_lines("  padded \r\n"), vec!["  padded \r", ""]);
    }

    #[test]
    fn test_missing_file_is_recorded_per_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never-written.out");
        let mut result = RunResult::default();

        harvest_into(&mut result, &path, &[ParseMode::Json, ParseMode::TextLines]);

        assert!(result.output_file_json_data.is_none());
        assert!(result.output_file_text_lines_data.is_none());
        let error = result.error_output_file.unwrap();
        assert_eq!(error.path, path.to_string_lossy());
        assert_eq!(error.reason, "file not found");
        assert_eq!(error.modes, vec![ParseMode::Json, ParseMode::TextLines]);
    }

    #[test]
    fn test_directory_in_place_of_file_is_recorded() {
        let dir = tempdir().unwrap();
        let mut result = RunResult::default();
        harvest_into(&mut result, dir.path(), &[ParseMode::TextLines]);
        let error = result.error_output_file.unwrap();
        assert_ne!(error.reason, "file not found");
    }

    #[test]
    fn test_all_modes_on_one_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"x\":1}\n{\"x\":2}\n").unwrap();
        let mut result = RunResult::default();

        harvest_into(
            &mut result,
            &path,
            &[ParseMode::Json, ParseMode::JsonLines, ParseMode::TextLines],
        );

        assert!(result.output_file_json_data.is_none());
        assert!(result.error_parsing_json.is_some());
        assert_eq!(
            result.output_file_json_lines_data,
            Some(vec![json!({"x": 1}), json!({"x": 2})])
        );
        assert_eq!(
            result.output_file_text_lines_data,
            Some(vec!["{\"x\":1}".to_string(), "{\"x\":2}".to_string(), String::new()])
        );
        assert!(result.error_output_file.is_none());
    }
}
