//! Application layer - use cases and orchestration.
//!
//! This layer contains the export pipeline, publication and the
//! output formatting built on top of the domain types.

pub mod aggregator;
pub mod backup_service;
pub mod fetcher;
pub mod formatter;
pub mod normalizer;
pub mod offsets;
pub mod ports;
pub mod publisher;

pub use aggregator::ExportAggregator;
pub use backup_service::{mirror_to_git, publish_backup, resolve_archive, PublishTarget};
pub use fetcher::ConversationFetcher;
pub use formatter::{format_batch_stats, format_batch_table, format_progress};
pub use ports::{ProgressListener, TokioScheduler};
pub use publisher::RemotePublisher;
