//! Domain-level error types for gpt-backup.
//!
//! All errors are typed with `thiserror` and carry enough context to tell
//! which stage of the export pipeline failed.

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// The session endpoint did not yield an access token.
    #[error("Failed to fetch token: {message}")]
    Token { message: String },

    /// A conversation listing call failed.
    #[error("Failed to fetch conversation ids at offset {offset}: {message}")]
    List { offset: u64, message: String },

    /// A conversation could not be fetched within the allowed attempts.
    #[error("Failed to fetch conversation {id} after {attempts} attempts: {last_error}")]
    FetchExhausted {
        id: String,
        attempts: u32,
        last_error: String,
    },

    /// The remote content store rejected an upsert.
    #[error("GitHub API error: {message}")]
    Publish { message: String },

    /// The version-control collaborator failed (clone, pull, commit, push).
    #[error("Git error: {message}")]
    VersionControl { message: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Failed to open or query the local archive cache.
    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Invalid or unexpected data.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or argument error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create an HTTP error from a reqwest error.
    pub fn http(err: reqwest::Error) -> Self {
        Self::Http {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a cache error from rusqlite error.
    pub fn cache(err: rusqlite::Error) -> Self {
        Self::Cache {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
