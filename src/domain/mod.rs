//! Domain layer - core types for the export pipeline.
//!
//! This layer contains pure domain models, configuration and error types
//! without any I/O.

pub mod error;
pub mod models;
pub mod settings;

pub use error::{AppError, Result};
pub use models::{
    ArchiveDocument, Conversation, ConversationPage, ConversationRef, ExportBatch, Message, Progress,
    RawConversationGraph, RawNode, RemoteArtifact, StopOffset, Token, PAGE_SIZE,
};
pub use settings::{AppConfig, Linearization, PacingConfig, RetryConfig};
