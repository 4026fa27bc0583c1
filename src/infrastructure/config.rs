//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# gpt-backup configuration
# Auto-generated - edit as needed. Tokens are read from the environment,
# never from this file.

[api]
base_url = "https://chatgpt.com"

[pacing]
# Delay before every page listing after the first (milliseconds)
page_delay_ms = 1000
# Delay before every conversation fetch (milliseconds)
fetch_delay_ms = 1000

[retry]
max_attempts = 3
initial_backoff_ms = 10000
multiplier = 2

[export]
# active-branch or mapping-order
linearization = "active-branch"
# output_dir = "/custom/exports"

[publish]
api_base = "https://api.github.com"
# repo = "owner/name"
branch = "main"
directory = "backups"

[git]
# repo_url = "https://github.com/owner/name.git"
# local_path = "/path/to/clone"
branch = "main"

[paths]
# Custom data directory (optional, defaults to ~/.gpt-backup)
# data_dir = "/custom/path"
"#;

/// Load configuration from `path` when given, else the default location.
///
/// A missing file yields the default configuration.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = path.map_or_else(config_file_path, Path::to_path_buf);

    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        if path.is_some() {
            return Err(AppError::Config {
                message: format!("Config file not found: {}", config_path.display()),
            });
        }
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Render a configuration as TOML.
///
/// # Errors
/// Returns error if serialization fails.
pub fn render_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })
}

/// Create default configuration file at `path` if it doesn't exist.
///
/// Returns whether a file was created.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %path.display(), "Created default configuration");

    Ok(true)
}

/// Get the path to the default configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    AppConfig::default_data_dir().join("config.toml")
}
