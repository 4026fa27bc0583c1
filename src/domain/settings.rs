//! Configuration models.
//!
//! Every section falls back to defaults so a partial `config.toml` is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Remote chat service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the chat service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "https://chatgpt.com".into()
}

fn default_user_agent() -> String {
    concat!("gpt-backup/", env!("CARGO_PKG_VERSION")).into()
}

/// Fixed delays between outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Delay before every listing call after the first.
    #[serde(default = "default_delay_ms")]
    pub page_delay_ms: u64,

    /// Delay before every conversation fetch.
    #[serde(default = "default_delay_ms")]
    pub fetch_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_delay_ms(),
            fetch_delay_ms: default_delay_ms(),
        }
    }
}

impl PacingConfig {
    #[must_use]
    pub const fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    #[must_use]
    pub const fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }
}

const fn default_delay_ms() -> u64 {
    1000 // ~60 conversations/minute
}

/// Retry policy for single-conversation fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Wait before attempt `attempt` (1-indexed): `initial * multiplier^attempt`.
    ///
    /// The first attempt never waits. Growth is uncapped apart from saturation.
    #[must_use]
    pub const fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.saturating_pow(attempt);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    10_000
}

const fn default_multiplier() -> u64 {
    2
}

/// How a branching message tree is flattened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Linearization {
    /// Root-to-leaf path of the branch the user last saw.
    #[default]
    ActiveBranch,
    /// Nodes in the order the server listed them.
    MappingOrder,
}

impl std::str::FromStr for Linearization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active-branch" | "active" => Ok(Self::ActiveBranch),
            "mapping-order" | "mapping" => Ok(Self::MappingOrder),
            _ => Err(format!(
                "Unknown linearization: {s}. Use: active-branch, mapping-order"
            )),
        }
    }
}

/// Archive export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory for archive files (defaults to `<data_dir>/exports`).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub linearization: Linearization,
}

/// Remote content store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_github_api")]
    pub api_base: String,

    /// Repository as `owner/name`.
    #[serde(default)]
    pub repo: Option<String>,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Directory inside the repository that receives archives.
    #[serde(default = "default_publish_dir")]
    pub directory: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api(),
            repo: None,
            branch: default_branch(),
            directory: default_publish_dir(),
        }
    }
}

fn default_github_api() -> String {
    "https://api.github.com".into()
}

fn default_branch() -> String {
    "main".into()
}

fn default_publish_dir() -> String {
    "backups".into()
}

/// Local git mirror settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default)]
    pub repo_url: Option<String>,

    /// Local clone path (defaults to `<data_dir>/repo`).
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    #[serde(default = "default_branch")]
    pub branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repo_url: None,
            local_path: None,
            branch: default_branch(),
        }
    }
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gpt-backup")
    }

    /// Get the archive cache database path.
    #[must_use]
    pub fn cache_db_path(&self) -> PathBuf {
        self.data_dir().join("cache.db")
    }

    /// Directory where archives are written.
    #[must_use]
    pub fn exports_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("exports"))
    }

    /// Path of the local git clone.
    #[must_use]
    pub fn git_repo_path(&self) -> PathBuf {
        self.git
            .local_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("repo"))
    }
}
