//! Single-conversation fetch with bounded retry.

use std::sync::Arc;

use crate::domain::{
    AppError, Conversation, Linearization, RawConversationGraph, Result, RetryConfig, Token,
};

use super::normalizer::normalize;
use super::ports::{ConversationSource, RateScheduler};

/// Fetches conversations one at a time, retrying every failure alike.
pub struct ConversationFetcher {
    source: Arc<dyn ConversationSource>,
    scheduler: Arc<dyn RateScheduler>,
    retry: RetryConfig,
    linearization: Linearization,
}

impl ConversationFetcher {
    #[must_use]
    pub fn new(
        source: Arc<dyn ConversationSource>,
        scheduler: Arc<dyn RateScheduler>,
        retry: RetryConfig,
        linearization: Linearization,
    ) -> Self {
        Self {
            source,
            scheduler,
            retry,
            linearization,
        }
    }

    /// Fetch the raw graph for `id`, making at most `max_attempts` calls.
    ///
    /// # Errors
    /// Returns `AppError::FetchExhausted` when every attempt failed.
    pub async fn fetch(&self, token: &Token, id: &str) -> Result<RawConversationGraph> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.source.get_conversation(token, id).await {
                Ok(raw) => return Ok(raw),
                Err(err) if attempt >= max_attempts => {
                    tracing::warn!(id, attempts = attempt, error = %err, "Giving up on conversation");
                    return Err(AppError::FetchExhausted {
                        id: id.to_string(),
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
                Err(err) => {
                    attempt += 1;
                    let delay = self.retry.backoff_before(attempt);
                    tracing::info!(
                        id,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Error. Retrying"
                    );
                    self.scheduler.wait(delay).await;
                }
            }
        }
    }

    /// Flatten a raw graph with the configured linearization.
    #[must_use]
    pub fn normalize(&self, raw: &RawConversationGraph) -> Conversation {
        normalize(raw, self.linearization)
    }

    /// Fetch and normalize in one step.
    ///
    /// # Errors
    /// Same as [`Self::fetch`].
    pub async fn fetch_conversation(&self, token: &Token, id: &str) -> Result<Conversation> {
        let raw = self.fetch(token, id).await?;
        Ok(self.normalize(&raw))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// Scheduler that records requested waits instead of sleeping.
    #[derive(Default)]
    pub struct RecordingScheduler {
        pub waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl RateScheduler for RecordingScheduler {
        async fn wait(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    /// Source that fails a fixed number of times per id before succeeding.
    pub struct FlakySource {
        failures: HashMap<String, u32>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FlakySource {
        pub fn new(failures: &[(&str, u32)]) -> Self {
            Self {
                failures: failures
                    .iter()
                    .map(|(id, n)| ((*id).to_string(), *n))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ConversationSource for FlakySource {
        async fn get_conversation(&self, _token: &Token, id: &str) -> Result<RawConversationGraph> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(id.to_string());
            let seen = u32::try_from(calls.iter().filter(|c| *c == id).count()).unwrap();
            drop(calls);

            if seen <= self.failures.get(id).copied().unwrap_or(0) {
                return Err(AppError::InvalidData {
                    message: "Unsuccessful response".into(),
                });
            }

            Ok(serde_json::from_value(json!({
                "title": id,
                "create_time": 1.0,
                "mapping": {
                    "n": {"message": {
                        "author": {"role": "user"},
                        "content": {"parts": [id]},
                        "metadata": {"model_slug": "gpt-4o"},
                        "create_time": 2.0
                    }}
                }
            }))
            .unwrap())
        }
    }

    fn fetcher(source: Arc<FlakySource>, scheduler: Arc<RecordingScheduler>) -> ConversationFetcher {
        ConversationFetcher::new(
            source,
            scheduler,
            RetryConfig::default(),
            Linearization::ActiveBranch,
        )
    }

    #[tokio::test]
    async fn test_success_first_attempt_has_no_delay() {
        let source = Arc::new(FlakySource::new(&[]));
        let scheduler = Arc::new(RecordingScheduler::default());

        let raw = fetcher(source.clone(), scheduler.clone())
            .fetch(&Token::new("t"), "c1")
            .await
            .unwrap();

        assert_eq!(raw.title.as_deref(), Some("c1"));
        assert_eq!(source.calls.lock().unwrap().len(), 1);
        assert!(scheduler.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recovers_on_last_attempt() {
        let source = Arc::new(FlakySource::new(&[("c1", 2)]));
        let scheduler = Arc::new(RecordingScheduler::default());

        let conv = fetcher(source.clone(), scheduler.clone())
            .fetch_conversation(&Token::new("t"), "c1")
            .await
            .unwrap();

        assert_eq!(conv.messages.len(), 1);
        assert_eq!(source.calls.lock().unwrap().len(), 3);
        assert_eq!(
            *scheduler.waits.lock().unwrap(),
            vec![Duration::from_secs(40), Duration::from_secs(80)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let source = Arc::new(FlakySource::new(&[("c1", 10)]));
        let scheduler = Arc::new(RecordingScheduler::default());

        let err = fetcher(source.clone(), scheduler.clone())
            .fetch(&Token::new("t"), "c1")
            .await
            .unwrap_err();

        match err {
            AppError::FetchExhausted { id, attempts, .. } => {
                assert_eq!(id, "c1");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(source.calls.lock().unwrap().len(), 3);
        assert_eq!(scheduler.waits.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let source = Arc::new(FlakySource::new(&[("c1", 1)]));
        let scheduler = Arc::new(RecordingScheduler::default());
        let fetcher = ConversationFetcher::new(
            source.clone(),
            scheduler.clone(),
            RetryConfig {
                max_attempts: 1,
                ..RetryConfig::default()
            },
            Linearization::ActiveBranch,
        );

        assert!(fetcher.fetch(&Token::new("t"), "c1").await.is_err());
        assert_eq!(source.calls.lock().unwrap().len(), 1);
        assert!(scheduler.waits.lock().unwrap().is_empty());
    }
}
