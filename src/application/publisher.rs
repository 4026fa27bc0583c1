//! Idempotent upsert of artifacts into a remote content store.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::domain::{RemoteArtifact, Result, Token};

use super::ports::{ContentStore, UpsertRequest};

/// Publishes artifacts with single-writer optimistic overwrite.
pub struct RemotePublisher {
    store: Arc<dyn ContentStore>,
}

impl RemotePublisher {
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Create or overwrite `path` on `branch`.
    ///
    /// A failed version lookup is treated as "does not exist yet". The upsert
    /// itself is not retried; a concurrent writer surfaces as one failure.
    ///
    /// # Errors
    /// Returns `AppError::Publish` when the store rejects the upsert.
    pub async fn publish(
        &self,
        credentials: &Token,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<RemoteArtifact> {
        let sha = match self.store.read_version(credentials, repo, path, branch).await {
            Ok(Some(sha)) => Some(sha),
            Ok(None) => {
                tracing::debug!(path, "File does not exist yet, will create it");
                None
            }
            Err(err) => {
                tracing::warn!(path, error = %err, "Version lookup failed, treating as new file");
                None
            }
        };

        let request = build_upsert(content, message, branch, sha);
        let version_token = self.store.upsert(credentials, repo, path, &request).await?;

        tracing::info!(repo, path, branch, "Published artifact");

        Ok(RemoteArtifact {
            path: path.to_string(),
            content: content.to_string(),
            version_token,
        })
    }
}

/// Upsert body carrying base64 content and, when known, the prior marker.
#[must_use]
pub fn build_upsert(content: &str, message: &str, branch: &str, sha: Option<String>) -> UpsertRequest {
    UpsertRequest {
        message: message.to_string(),
        content: STANDARD.encode(content.as_bytes()),
        branch: branch.to_string(),
        sha,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::AppError;

    /// Store with a single optional version per path.
    #[derive(Default)]
    pub struct MemoryStore {
        pub version: Mutex<Option<String>>,
        pub fail_lookup: bool,
        pub reject_with: Option<String>,
        pub requests: Mutex<Vec<(String, UpsertRequest)>>,
    }

    #[async_trait]
    impl ContentStore for MemoryStore {
        async fn read_version(
            &self,
            _credentials: &Token,
            _repo: &str,
            _path: &str,
            _branch: &str,
        ) -> Result<Option<String>> {
            if self.fail_lookup {
                return Err(AppError::InvalidData {
                    message: "connection reset".into(),
                });
            }
            Ok(self.version.lock().unwrap().clone())
        }

        async fn upsert(
            &self,
            _credentials: &Token,
            _repo: &str,
            path: &str,
            request: &UpsertRequest,
        ) -> Result<Option<String>> {
            self.requests
                .lock()
                .unwrap()
                .push((path.to_string(), request.clone()));
            if let Some(reason) = &self.reject_with {
                return Err(AppError::Publish {
                    message: reason.clone(),
                });
            }
            let next = format!("sha-{}", self.requests.lock().unwrap().len());
            *self.version.lock().unwrap() = Some(next.clone());
            Ok(Some(next))
        }
    }

    fn creds() -> Token {
        Token::new("ghp_test")
    }

    #[tokio::test]
    async fn test_create_omits_marker() {
        let store = Arc::new(MemoryStore::default());
        let publisher = RemotePublisher::new(store.clone());

        let artifact = publisher
            .publish(&creds(), "me/backup", "backups/a.json", "[]", "msg", "main")
            .await
            .unwrap();

        assert_eq!(artifact.version_token.as_deref(), Some("sha-1"));
        let requests = store.requests.lock().unwrap();
        let (path, request) = &requests[0];
        assert_eq!(path, "backups/a.json");
        assert!(request.sha.is_none());
        let body = serde_json::to_value(request).unwrap();
        assert!(body.get("sha").is_none());
        assert_eq!(body["branch"], "main");
    }

    #[tokio::test]
    async fn test_update_passes_marker_unchanged() {
        let store = Arc::new(MemoryStore {
            version: Mutex::new(Some("abc123".into())),
            ..MemoryStore::default()
        });
        let publisher = RemotePublisher::new(store.clone());

        publisher
            .publish(&creds(), "me/backup", "backups/a.json", "[]", "msg", "main")
            .await
            .unwrap();

        let requests = store.requests.lock().unwrap();
        assert_eq!(requests[0].1.sha.as_deref(), Some("abc123"));
        let body = serde_json::to_value(&requests[0].1).unwrap();
        assert_eq!(body["sha"], "abc123");
    }

    #[tokio::test]
    async fn test_failed_lookup_means_create() {
        let store = Arc::new(MemoryStore {
            fail_lookup: true,
            ..MemoryStore::default()
        });
        let publisher = RemotePublisher::new(store.clone());

        publisher
            .publish(&creds(), "me/backup", "a.json", "{}", "msg", "main")
            .await
            .unwrap();

        assert!(store.requests.lock().unwrap()[0].1.sha.is_none());
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let store = Arc::new(MemoryStore {
            reject_with: Some("is at abc but expected def".into()),
            ..MemoryStore::default()
        });
        let publisher = RemotePublisher::new(store.clone());

        let err = publisher
            .publish(&creds(), "me/backup", "a.json", "{}", "msg", "main")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Publish { ref message } if message.contains("expected")));
        assert_eq!(store.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_content_is_base64_utf8() {
        let request = build_upsert("héllo ✓", "m", "main", None);
        let decoded = STANDARD.decode(&request.content).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "héllo ✓");
    }
}
