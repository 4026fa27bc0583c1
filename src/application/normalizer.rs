//! Flattening of raw conversation graphs into archive conversations.
//!
//! The remote service stores a conversation as a tree of message nodes;
//! edits and regenerations create sibling branches. The archive keeps one
//! linear sequence per conversation, chosen by a [`Linearization`] policy.

use std::collections::{HashMap, HashSet};

use crate::domain::{Conversation, Linearization, Message, RawConversationGraph, RawNode};

/// Role used when a message carries no author.
const UNKNOWN_ROLE: &str = "unknown";

/// Normalizes a raw graph into a [`Conversation`].
///
/// Title and creation time come from the graph itself; nodes without a
/// message payload are skipped.
#[must_use]
pub fn normalize(raw: &RawConversationGraph, policy: Linearization) -> Conversation {
    let messages = linearize(raw, policy)
        .into_iter()
        .filter_map(project)
        .collect();

    Conversation {
        messages,
        create_time: raw.create_time,
        title: raw.title.clone(),
    }
}

/// Orders the graph's nodes according to `policy`.
fn linearize(raw: &RawConversationGraph, policy: Linearization) -> Vec<&RawNode> {
    match policy {
        Linearization::MappingOrder => raw.mapping.iter().map(|(_, node)| node).collect(),
        Linearization::ActiveBranch => active_branch(raw),
    }
}

/// Root-to-leaf path of the active branch.
///
/// Uses `current_node` when it points into the mapping; otherwise descends
/// from the root through the last listed child at each level.
fn active_branch(raw: &RawConversationGraph) -> Vec<&RawNode> {
    let index: HashMap<&str, &RawNode> = raw
        .mapping
        .iter()
        .map(|(id, node)| (id.as_str(), node))
        .collect();

    if let Some(leaf) = raw
        .current_node
        .as_deref()
        .filter(|id| index.contains_key(id))
    {
        return ancestry(&index, leaf);
    }

    let root = raw.mapping.iter().find(|(_, node)| {
        node.parent
            .as_deref()
            .is_none_or(|parent| !index.contains_key(parent))
    });

    match root {
        Some((root_id, _)) => descend_latest(&index, root_id),
        None => {
            tracing::debug!("No root node found, falling back to mapping order");
            raw.mapping.iter().map(|(_, node)| node).collect()
        }
    }
}

fn ancestry<'a>(index: &HashMap<&str, &'a RawNode>, leaf: &str) -> Vec<&'a RawNode> {
    let mut path = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(leaf);

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let Some(node) = index.get(id).copied() else {
            break;
        };
        path.push(node);
        current = node.parent.as_deref();
    }

    path.reverse();
    path
}

fn descend_latest<'a>(index: &HashMap<&str, &'a RawNode>, root: &str) -> Vec<&'a RawNode> {
    let mut path = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(root);

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let Some(node) = index.get(id).copied() else {
            break;
        };
        path.push(node);
        current = node
            .children
            .iter()
            .rev()
            .map(String::as_str)
            .find(|child| index.contains_key(child));
    }

    path
}

/// Projects a node's message payload, if any.
fn project(node: &RawNode) -> Option<Message> {
    let msg = node.message.as_ref()?;

    Some(Message {
        role: msg
            .author
            .as_ref()
            .and_then(|a| a.role.clone())
            .unwrap_or_else(|| UNKNOWN_ROLE.to_string()),
        content: msg
            .content
            .as_ref()
            .map(|c| c.parts.clone())
            .unwrap_or_default(),
        model: msg.metadata.as_ref().and_then(|m| m.model_slug.clone()),
        create_time: msg.create_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn graph(value: Value) -> RawConversationGraph {
        serde_json::from_value(value).unwrap()
    }

    fn text_node(parent: Option<&str>, children: &[&str], text: &str) -> Value {
        json!({
            "parent": parent,
            "children": children,
            "message": {
                "author": {"role": "user"},
                "content": {"parts": [text]},
                "metadata": {},
                "create_time": 1.0
            }
        })
    }

    fn texts(conv: &Conversation) -> Vec<String> {
        conv.messages
            .iter()
            .map(|m| m.content[0].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_single_node_projection() {
        let raw = graph(json!({
            "title": "Greeting",
            "create_time": 10.0,
            "mapping": {
                "a": {"message": {
                    "author": {"role": "user"},
                    "content": {"parts": ["hi"]},
                    "metadata": {"model_slug": "x"},
                    "create_time": 1
                }}
            }
        }));

        let conv = normalize(&raw, Linearization::ActiveBranch);

        assert_eq!(
            conv.messages,
            vec![Message {
                role: "user".into(),
                content: vec![json!("hi")],
                model: Some("x".into()),
                create_time: Some(1.0),
            }]
        );
        assert_eq!(conv.title.as_deref(), Some("Greeting"));
        assert_eq!(conv.create_time, Some(10.0));
    }

    #[test]
    fn test_nodes_without_message_are_skipped() {
        let raw = graph(json!({
            "mapping": {
                "root": {"children": ["a"]},
                "a": text_node(Some("root"), &[], "hello")
            }
        }));

        let conv = normalize(&raw, Linearization::MappingOrder);
        assert_eq!(texts(&conv), vec!["hello"]);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let raw = graph(json!({"mapping": {"a": {"message": {}}}}));

        let conv = normalize(&raw, Linearization::ActiveBranch);
        assert_eq!(conv.messages[0].role, "unknown");
        assert!(conv.messages[0].content.is_empty());
        assert!(conv.messages[0].model.is_none());
    }

    #[test]
    fn test_active_branch_follows_current_node() {
        // root -> q -> {old, new}; current_node points at the older branch.
        let raw = graph(json!({
            "current_node": "old",
            "mapping": {
                "new": text_node(Some("q"), &[], "regenerated"),
                "root": {"children": ["q"]},
                "q": text_node(Some("root"), &["old", "new"], "question"),
                "old": text_node(Some("q"), &[], "first answer")
            }
        }));

        let conv = normalize(&raw, Linearization::ActiveBranch);
        assert_eq!(texts(&conv), vec!["question", "first answer"]);
    }

    #[test]
    fn test_active_branch_without_current_node_takes_latest_child() {
        let raw = graph(json!({
            "mapping": {
                "new": text_node(Some("q"), &[], "regenerated"),
                "root": {"children": ["q"]},
                "q": text_node(Some("root"), &["old", "new"], "question"),
                "old": text_node(Some("q"), &[], "first answer")
            }
        }));

        let conv = normalize(&raw, Linearization::ActiveBranch);
        assert_eq!(texts(&conv), vec!["question", "regenerated"]);
    }

    #[test]
    fn test_mapping_order_keeps_server_order() {
        let raw = graph(json!({
            "mapping": {
                "new": text_node(Some("q"), &[], "regenerated"),
                "q": text_node(None, &["old", "new"], "question"),
                "old": text_node(Some("q"), &[], "first answer")
            }
        }));

        let conv = normalize(&raw, Linearization::MappingOrder);
        assert_eq!(texts(&conv), vec!["regenerated", "question", "first answer"]);
    }

    #[test]
    fn test_cyclic_parents_terminate() {
        let raw = graph(json!({
            "current_node": "a",
            "mapping": {
                "a": text_node(Some("b"), &["b"], "a"),
                "b": text_node(Some("a"), &["a"], "b")
            }
        }));

        let conv = normalize(&raw, Linearization::ActiveBranch);
        assert_eq!(texts(&conv), vec!["b", "a"]);

        let no_leaf = graph(json!({
            "mapping": {
                "a": text_node(Some("b"), &["b"], "a"),
                "b": text_node(Some("a"), &["a"], "b")
            }
        }));
        assert_eq!(normalize(&no_leaf, Linearization::ActiveBranch).messages.len(), 2);
    }
}
