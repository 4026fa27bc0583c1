//! Seams between the export pipeline and the outside world.
//!
//! Infrastructure adapters implement these traits; tests substitute fakes.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ConversationPage, Progress, RawConversationGraph, Result, Token};

/// Obtains the bearer credential used for the whole run.
#[async_trait]
pub trait SessionTokenProvider: Send + Sync {
    async fn token(&self) -> Result<Token>;
}

/// Lists one page of conversation references.
#[async_trait]
pub trait ConversationLister: Send + Sync {
    /// # Errors
    /// Returns `AppError::List` on a non-success response.
    async fn list_page(&self, token: &Token, offset: u64) -> Result<ConversationPage>;
}

/// Performs a single, non-retried conversation fetch.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    async fn get_conversation(&self, token: &Token, id: &str) -> Result<RawConversationGraph>;
}

/// The only suspension primitive of the pipeline.
#[async_trait]
pub trait RateScheduler: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Scheduler backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl RateScheduler for TokioScheduler {
    async fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Receives progress reports from the aggregator.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, progress: Progress);
}

/// Listener that ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn on_progress(&self, _progress: Progress) {}
}

/// Body of a content-store upsert.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UpsertRequest {
    pub message: String,
    /// Base64-encoded UTF-8 content.
    pub content: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Remote content store with per-object revision markers.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Current version marker at `path`, or `None` when the object is absent.
    async fn read_version(
        &self,
        credentials: &Token,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>>;

    /// Create or overwrite `path`; returns the new version marker, if reported.
    ///
    /// # Errors
    /// Returns `AppError::Publish` with the remote reason on rejection.
    async fn upsert(
        &self,
        credentials: &Token,
        repo: &str,
        path: &str,
        request: &UpsertRequest,
    ) -> Result<Option<String>>;
}

/// A file to place in a version-controlled working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    /// Path relative to the repository root.
    pub path: String,
    pub content: String,
}

/// Local version-control working copy.
pub trait VersionControl {
    fn clone_if_absent(&self, url: &str, branch: &str) -> Result<()>;

    fn pull(&self) -> Result<()>;

    fn write_files(&self, files: &[RepoFile]) -> Result<()>;

    /// Commit and push everything; `false` when the tree was unchanged.
    fn commit_and_push(&self, message: &str) -> Result<bool>;
}
