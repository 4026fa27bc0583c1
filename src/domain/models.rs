//! Domain models for exported chat data.
//!
//! Raw types mirror the remote API payloads; the flattened types are what
//! ends up in the archive.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Number of conversations per listing page.
pub const PAGE_SIZE: u64 = 20;

/// Opaque bearer credential for the chat service.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(****)")
    }
}

/// Upper bound for a paginated export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOffset {
    /// Export everything the server reports.
    Unlimited,
    /// Stop listing once this offset is reached.
    Limit(u64),
}

impl StopOffset {
    /// Build from the CLI representation where `-1` means no limit.
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        u64::try_from(raw).map_or(Self::Unlimited, Self::Limit)
    }

    /// Whether listing must halt at `offset`.
    #[must_use]
    pub const fn reached(self, offset: u64) -> bool {
        match self {
            Self::Unlimited => false,
            Self::Limit(stop) => offset >= stop,
        }
    }
}

/// Reference to one conversation and the page it was discovered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRef {
    pub id: String,
    pub offset: u64,
}

/// One page of conversation references.
#[derive(Debug, Clone, Default)]
pub struct ConversationPage {
    pub items: Vec<ConversationRef>,
    /// Server-side count of all conversations at the time of the call.
    pub total: u64,
}

/// Raw conversation as returned by the single-conversation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConversationGraph {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub create_time: Option<f64>,
    /// Leaf of the branch currently shown to the user.
    #[serde(default)]
    pub current_node: Option<String>,
    /// Nodes in the order the server sent them.
    #[serde(default, deserialize_with = "ordered_nodes")]
    pub mapping: Vec<(String, RawNode)>,
}

/// A node of the message tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub message: Option<RawMessage>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub author: Option<RawAuthor>,
    #[serde(default)]
    pub content: Option<RawContent>,
    #[serde(default)]
    pub metadata: Option<RawMetadata>,
    #[serde(default)]
    pub create_time: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawContent {
    #[serde(default)]
    pub parts: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetadata {
    #[serde(default)]
    pub model_slug: Option<String>,
}

/// Keeps mapping entries in document order regardless of map implementation.
fn ordered_nodes<'de, D>(deserializer: D) -> Result<Vec<(String, RawNode)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct NodesVisitor;

    impl<'de> Visitor<'de> for NodesVisitor {
        type Value = Vec<(String, RawNode)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of node id to node")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut nodes = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((id, node)) = access.next_entry::<String, RawNode>()? {
                nodes.push((id, node));
            }
            Ok(nodes)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(NodesVisitor)
}

/// Flattened projection of one message node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<Value>,
    /// Omitted from the archive when the node had no model slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub create_time: Option<f64>,
}

/// A normalized conversation as stored in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
    pub create_time: Option<f64>,
    pub title: Option<String>,
}

impl Conversation {
    /// Get total message count.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Distinct model slugs in order of first use.
    #[must_use]
    pub fn models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = Vec::new();
        for model in self.messages.iter().filter_map(|m| m.model.as_deref()) {
            if !models.contains(&model) {
                models.push(model);
            }
        }
        models
    }
}

/// Conversations in fetch-completion order; the unit persisted and published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportBatch {
    pub conversations: Vec<Conversation>,
}

impl ExportBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn push(&mut self, conversation: Conversation) {
        self.conversations.push(conversation);
    }

    /// Total messages across all conversations.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.conversations.iter().map(Conversation::message_count).sum()
    }
}

/// A serialized archive together with its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDocument {
    pub file_name: String,
    pub json: String,
}

/// An artifact in the remote content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    pub path: String,
    pub content: String,
    /// Revision marker for optimistic overwrite; absent before creation.
    pub version_token: Option<String>,
}

/// One progress report emitted during an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub percent: u32,
    pub offset: u64,
    pub accumulated: usize,
    pub requested: u64,
}

impl Progress {
    /// Compute `round(100 * accumulated / requested)`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn new(accumulated: usize, requested: u64, offset: u64) -> Self {
        let percent = if requested == 0 {
            100
        } else {
            (100.0 * accumulated as f64 / requested as f64).round() as u32
        };

        Self {
            percent,
            offset,
            accumulated,
            requested,
        }
    }
}
