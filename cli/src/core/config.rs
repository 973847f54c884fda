//! # Echelon Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module loads, merges and validates Echelon's configuration. The
//! configuration controls how child processes are launched (direct exec or
//! shell opt-in), how much of their output is captured, which placeholder
//! token is substituted with the output file path, and how output file names
//! are formed.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Command-line flags (applied by the command handlers, not here)
//! 2. Project-specific `.echelon.toml` in the current directory or ancestors
//! 3. User-specific `<config dir>/echelon/config.toml`, or the file named by
//!    the `ECHELON_CONFIG` environment variable
//! 4. Default values defined in the code
//!
//! Paths are expanded (`~` to the home directory) and the merged result is
//! validated before use.
//!
//! ## Examples
//!
//! ```toml
//! [execution]
//! use_shell = false
//! shell = "/bin/sh"
//! working_directory = "~/scans"
//!
//! [capture]
//! max_bytes = 16777216
//!
//! [placeholder]
//! token = "FILENAME"
//! substitution = "token"
//!
//! [output_file]
//! prefix = "output"
//! extension = "out"
//! ```
//!
use crate::core::error::{EchelonError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub placeholder: PlaceholderConfig,
    #[serde(default)]
    pub output_file: OutputFileConfig,
}

/// How child processes are launched.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Run the command line through `shell -c` instead of executing the
    /// program directly. Shell metacharacters in arguments become live.
    #[serde(default)]
    pub use_shell: bool,
    /// Interpreter used when `use_shell` is set.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Directory children run in and output files are created under.
    /// `None` means the current directory at invocation time.
    #[serde(default)]
    pub working_directory: Option<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            use_shell: false,
            shell: default_shell(),
            working_directory: None,
        }
    }
}

/// Limits on captured stdout/stderr.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    /// Maximum bytes kept per stream. `0` disables the limit.
    #[serde(default = "default_max_capture_bytes")]
    pub max_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_capture_bytes(),
        }
    }
}

/// How an argument token containing the placeholder is rewritten.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionStyle {
    /// The whole token becomes the output path.
    #[default]
    Token,
    /// Each occurrence inside the token is replaced in place.
    Substring,
}

/// Placeholder token settings.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlaceholderConfig {
    #[serde(default = "default_placeholder_token")]
    pub token: String,
    #[serde(default)]
    pub substitution: SubstitutionStyle,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            token: default_placeholder_token(),
            substitution: SubstitutionStyle::default(),
        }
    }
}

/// Naming of the per-item output file: `<prefix>-<millis>-<random>.<extension>`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputFileConfig {
    #[serde(default = "default_output_prefix")]
    pub prefix: String,
    #[serde(default = "default_output_extension")]
    pub extension: String,
}

impl Default for OutputFileConfig {
    fn default() -> Self {
        Self {
            prefix: default_output_prefix(),
            extension: default_output_extension(),
        }
    }
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}
fn default_max_capture_bytes() -> usize {
    16 * 1024 * 1024
}
fn default_placeholder_token() -> String {
    "FILENAME".to_string()
}
fn default_output_prefix() -> String {
    "output".to_string()
}
fn default_output_extension() -> String {
    "out".to_string()
}

const PROJECT_CONFIG_FILENAME: &str = ".echelon.toml";
const CONFIG_PATH_ENV: &str = "ECHELON_CONFIG";

/// Loads the merged configuration, searching for a project file from the
/// current directory upwards.
pub fn load_config() -> Result<Config> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    load_config_from(&current_dir)
}

/// Loads the merged configuration, searching for a project file from `start`
/// upwards.
pub fn load_config_from(start: &Path) -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config(start)?;
    let mut merged_config = merge_configs(user_config.unwrap_or_default(), project_config);
    expand_config_paths(&mut merged_config).context("Failed to expand paths in configuration")?;
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(shellexpand::tilde(&explicit).into_owned());
        info!(
            "Loading configuration named by {}: {}",
            CONFIG_PATH_ENV,
            path.display()
        );
        return load_config_from_path(&path).map(Some);
    }
    if let Some(proj_dirs) = ProjectDirs::from("com", "Echelon", "echelon") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config(start: &Path) -> Result<Option<Config>> {
    if let Some(project_config_path) = find_project_config_path(start) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.echelon.toml) found in {} or ancestors.", start.display());
        Ok(None)
    }
}

fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))?;
    if let Some(base) = path.parent() {
        anchor_working_directory(&mut config, base);
    }
    Ok(config)
}

/// A relative `working_directory` is relative to the file that names it.
fn anchor_working_directory(config: &mut Config, base: &Path) {
    if let Some(dir) = config.execution.working_directory.as_mut() {
        let expanded = PathBuf::from(shellexpand::tilde(dir.as_str()).into_owned());
        if expanded.is_relative() {
            *dir = base.join(expanded).to_string_lossy().into_owned();
            debug!("Anchored working directory to {}", dir);
        }
    }
}

/// Project values that differ from the defaults win over user values.
fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project_cfg = match project {
        Some(p) => p,
        None => return user,
    };
    let defaults = Config::default();
    let mut merged = Config::default();

    merged.execution.use_shell = project_cfg.execution.use_shell || user.execution.use_shell;
    merged.execution.shell = if project_cfg.execution.shell != defaults.execution.shell {
        project_cfg.execution.shell
    } else {
        user.execution.shell
    };
    merged.execution.working_directory = project_cfg
        .execution
        .working_directory
        .or(user.execution.working_directory);
    merged.capture.max_bytes = if project_cfg.capture.max_bytes != defaults.capture.max_bytes {
        project_cfg.capture.max_bytes
    } else {
        user.capture.max_bytes
    };
    merged.placeholder.token = if project_cfg.placeholder.token != defaults.placeholder.token {
        project_cfg.placeholder.token
    } else {
        user.placeholder.token
    };
    merged.placeholder.substitution =
        if project_cfg.placeholder.substitution != defaults.placeholder.substitution {
            project_cfg.placeholder.substitution
        } else {
            user.placeholder.substitution
        };
    merged.output_file.prefix = if project_cfg.output_file.prefix != defaults.output_file.prefix {
        project_cfg.output_file.prefix
    } else {
        user.output_file.prefix
    };
    merged.output_file.extension =
        if project_cfg.output_file.extension != defaults.output_file.extension {
            project_cfg.output_file.extension
        } else {
            user.output_file.extension
        };
    merged
}

fn expand_config_paths(config: &mut Config) -> Result<()> {
    if let Some(dir) = config.execution.working_directory.as_mut() {
        *dir = shellexpand::tilde(dir).into_owned();
        debug!("Expanded working directory: {}", dir);
    }
    Ok(())
}

/// Checks the merged configuration for values the pipeline cannot work with.
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("Validating final configuration...");
    if config.placeholder.token.is_empty() {
        return Err(anyhow!(EchelonError::Config(
            "placeholder.token must not be empty.".to_string()
        )));
    }
    if config.execution.use_shell && config.execution.shell.trim().is_empty() {
        return Err(anyhow!(EchelonError::Config(
            "execution.shell must be set when execution.use_shell is enabled.".to_string()
        )));
    }
    for (key, value) in [
        ("output_file.prefix", &config.output_file.prefix),
        ("output_file.extension", &config.output_file.extension),
    ] {
        if value.contains('/') || value.contains(std::path::MAIN_SEPARATOR) {
            return Err(anyhow!(EchelonError::Config(format!(
                "{} must not contain a path separator: '{}'",
                key, value
            ))));
        }
    }
    if let Some(dir) = &config.execution.working_directory {
        let dir = PathBuf::from(dir);
        if !dir.exists() {
            warn!(
                "Configured working directory '{}' does not exist.",
                dir.display()
            );
        } else if !dir.is_dir() {
            return Err(anyhow!(EchelonError::Config(format!(
                "Configured working directory '{}' exists but is not a directory.",
                dir.display()
            ))));
        }
    }
    debug!("Configuration validation successful.");
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_deserialize_basic_toml() {
        let toml_content = r#"
            [execution]
            use_shell = true
            working_directory = "~/scans"

            [capture]
            max_bytes = 1024

            [placeholder]
            substitution = "substring"
        "#;

        let config: Config = toml::from_str(toml_content).expect("Failed to parse TOML");

        assert!(config.execution.use_shell);
        assert_eq!(config.execution.shell, "/bin/sh"); // Default
        assert_eq!(config.execution.working_directory.as_deref(), Some("~/scans"));
        assert_eq!(config.capture.max_bytes, 1024);
        assert_eq!(config.placeholder.token, "FILENAME"); // Default
        assert_eq!(config.placeholder.substitution, SubstitutionStyle::Substring);
        assert_eq!(config.output_file, OutputFileConfig::default());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[execution]\ntimeout = 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_path_expansion() {
        let mut config = Config {
            execution: ExecutionConfig {
                working_directory: Some("~/scan_out".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        expand_config_paths(&mut config).unwrap();

        let home_dir = dirs::home_dir().unwrap();
        assert_eq!(
            config.execution.working_directory.unwrap(),
            home_dir.join("scan_out").to_string_lossy()
        );
    }

    #[test]
    fn test_merge_project_overrides_user() {
        let user = Config {
            capture: CaptureConfig { max_bytes: 10 },
            placeholder: PlaceholderConfig {
                token: "OUTFILE".into(),
                substitution: SubstitutionStyle::Token,
            },
            ..Default::default()
        };
        let project = Config {
            placeholder: PlaceholderConfig {
                token: "FILENAME".into(),
                substitution: SubstitutionStyle::Substring,
            },
            output_file: OutputFileConfig {
                prefix: "scan".into(),
                extension: "json".into(),
            },
            ..Default::default()
        };

        let merged = merge_configs(user, Some(project));

        assert_eq!(merged.capture.max_bytes, 10); // Project left it at default
        assert_eq!(merged.placeholder.token, "OUTFILE");
        assert_eq!(merged.placeholder.substitution, SubstitutionStyle::Substring);
        assert_eq!(merged.output_file.prefix, "scan");
        assert_eq!(merged.output_file.extension, "json");
    }

    #[test]
    fn test_find_project_config_in_ancestor() {
        let root = tempdir().unwrap();
        fs::write(
            root.path().join(PROJECT_CONFIG_FILENAME),
            "[capture]\nmax_bytes = 0\n",
        )
        .unwrap();
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = find_project_config_path(&nested).unwrap();
        assert_eq!(found, root.path().join(PROJECT_CONFIG_FILENAME));
        assert_eq!(load_config_from_path(&found).unwrap().capture.max_bytes, 0);
    }

    #[test]
    fn test_relative_working_directory_follows_config_file() {
        let root = tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir(root.path().join(".git")).unwrap();
        fs::write(
            root.path().join(PROJECT_CONFIG_FILENAME),
            "[execution]\nworking_directory = \"scans\"\n",
        )
        .unwrap();

        let project = load_project_config(&nested).unwrap().unwrap();
        assert_eq!(
            project.execution.working_directory.map(PathBuf::from),
            Some(root.path().join("scans"))
        );
    }

    #[test]
    fn test_anchoring_keeps_absolute_and_home_paths() {
        let mut config = Config::default();
        config.execution.working_directory = Some("/srv/scans".to_string());
        anchor_working_directory(&mut config, Path::new("/etc/echelon"));
        assert_eq!(config.execution.working_directory.as_deref(), Some("/srv/scans"));

        config.execution.working_directory = Some("~/scans".to_string());
        anchor_working_directory(&mut config, Path::new("/etc/echelon"));
        assert_eq!(config.execution.working_directory.as_deref(), Some("~/scans"));
    }

    #[test]
    fn test_project_search_stops_at_git_dir() {
        let root = tempdir().unwrap();
        fs::write(root.path().join(PROJECT_CONFIG_FILENAME), "").unwrap();
        let repo = root.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert!(find_project_config_path(&repo).is_none());
    }

    #[test]
    fn test_validate_config_empty_token() {
        let config = Config {
            placeholder: PlaceholderConfig {
                token: String::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("placeholder.token must not be empty"));
    }

    #[test]
    fn test_validate_config_prefix_with_separator() {
        let config = Config {
            output_file: OutputFileConfig {
                prefix: "../escape".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_working_dir_is_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("not_a_dir");
        fs::write(&file_path, "").unwrap();

        let config = Config {
            execution: ExecutionConfig {
                working_directory: Some(file_path.to_string_lossy().to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("is not a directory"));
    }

    #[test]
    fn test_validate_config_defaults_ok() {
        assert!(validate_config(&Config::default()).is_ok());
    }
}
