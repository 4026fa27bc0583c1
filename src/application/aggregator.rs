//! Export orchestration.
//!
//! Drives pagination and per-conversation fetches strictly sequentially,
//! paced by the [`RateScheduler`].

use std::sync::Arc;

use crate::domain::{
    AppError, ConversationRef, ExportBatch, PacingConfig, Progress, Result, StopOffset, Token,
    PAGE_SIZE,
};

use super::fetcher::ConversationFetcher;
use super::offsets::{generate_offsets, last_offset, offsets_until, request_count};
use super::ports::{
    ConversationLister, NoProgress, ProgressListener, RateScheduler, SessionTokenProvider,
};

/// Progress is reported each time this many conversations have accumulated.
const PROGRESS_INTERVAL: usize = 20;

/// Runs a full export and accumulates conversations in arrival order.
pub struct ExportAggregator {
    tokens: Arc<dyn SessionTokenProvider>,
    lister: Arc<dyn ConversationLister>,
    fetcher: ConversationFetcher,
    scheduler: Arc<dyn RateScheduler>,
    pacing: PacingConfig,
    progress: Arc<dyn ProgressListener>,
}

impl ExportAggregator {
    #[must_use]
    pub fn new(
        tokens: Arc<dyn SessionTokenProvider>,
        lister: Arc<dyn ConversationLister>,
        fetcher: ConversationFetcher,
        scheduler: Arc<dyn RateScheduler>,
        pacing: PacingConfig,
    ) -> Self {
        Self {
            tokens,
            lister,
            fetcher,
            scheduler,
            pacing,
            progress: Arc::new(NoProgress),
        }
    }

    /// Attach a progress listener.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressListener>) -> Self {
        self.progress = progress;
        self
    }

    /// Export every conversation from `start` up to `stop`.
    ///
    /// Any unrecovered failure aborts the run and discards what was fetched.
    ///
    /// # Errors
    /// Propagates token, listing and fetch errors.
    pub async fn run(&self, start: u64, stop: StopOffset) -> Result<ExportBatch> {
        if let StopOffset::Limit(limit) = stop {
            if limit <= start {
                return Err(AppError::Config {
                    message: format!("Stop offset {limit} must be greater than start offset {start}"),
                });
            }
            if (limit - start) % PAGE_SIZE != 0 {
                return Err(AppError::Config {
                    message: format!(
                        "Stop offset {limit} must be start offset {start} plus a multiple of {PAGE_SIZE}"
                    ),
                });
            }
        }

        let token = self.tokens.token().await?;
        let (refs, total, offsets) = self.collect_refs(&token, start, stop).await?;

        let requested = request_count(total, start, stop);
        let final_offset = last_offset(start, &offsets, stop);

        tracing::info!(
            total_offsets = final_offset,
            requested,
            total,
            "Starting export"
        );

        let mut batch = ExportBatch::default();

        for item in &refs {
            self.scheduler.wait(self.pacing.fetch_delay()).await;

            if batch.len() % PROGRESS_INTERVAL == 0 {
                self.report(batch.len(), requested, item.offset);
            }

            let conversation = self.fetcher.fetch_conversation(&token, &item.id).await?;
            tracing::debug!(id = %item.id, messages = conversation.message_count(), "Fetched conversation");
            batch.push(conversation);
        }

        self.report(batch.len(), requested, final_offset);

        Ok(batch)
    }

    /// List the first page and every following page until `stop`.
    async fn collect_refs(
        &self,
        token: &Token,
        start: u64,
        stop: StopOffset,
    ) -> Result<(Vec<ConversationRef>, u64, Vec<u64>)> {
        let first = self.lister.list_page(token, start).await?;
        let total = first.total;
        let mut refs = first.items;

        let offsets = generate_offsets(start, total);
        let listed = offsets_until(&offsets, stop);

        for &offset in listed {
            self.scheduler.wait(self.pacing.page_delay()).await;

            let page = self.lister.list_page(token, offset).await?;
            tracing::debug!(offset, items = page.items.len(), "Listed page");
            refs.extend(page.items);
        }

        Ok((refs, total, offsets))
    }

    fn report(&self, accumulated: usize, requested: u64, offset: u64) {
        let progress = Progress::new(accumulated, requested, offset);
        tracing::info!(percent = progress.percent, offset, "Progress");
        self.progress.on_progress(progress);
    }
}
