//! Render tree
//!
//! The server renders a screen into a tree of [`Node`]s. Parts of the tree
//! that need a store round-trip are emitted first as [`Node::Deferred`]
//! placeholders and filled in later by [`TreeChunk::Resolve`] frames.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a deferred subtree within one render stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// NODES
// ============================================================================

/// One node of a rendered screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Node>,
    },
    Text {
        text: String,
    },
    /// Placeholder for a subtree that arrives later in the same stream.
    Deferred {
        slot: SlotId,
    },
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Self {
        Node::Element {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text { text: text.into() }
    }

    pub fn deferred(slot: SlotId) -> Self {
        Node::Deferred { slot }
    }

    /// Set an attribute. No-op on non-element nodes.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Node::Element { attrs, .. } = &mut self {
            attrs.insert(name.into(), value.into());
        }
        self
    }

    /// Append a child. No-op on non-element nodes.
    pub fn child(mut self, node: Node) -> Self {
        if let Node::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        if let Node::Element { children, .. } = &mut self {
            children.extend(nodes);
        }
        self
    }

    /// Concatenated text of this subtree. Deferred slots contribute nothing.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text { text } => out.push_str(text),
            Node::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
            Node::Deferred { .. } => {}
        }
    }

    /// Slots referenced anywhere in this subtree, in document order.
    pub fn deferred_slots(&self) -> Vec<SlotId> {
        let mut slots = Vec::new();
        self.collect_slots(&mut slots);
        slots
    }

    fn collect_slots(&self, slots: &mut Vec<SlotId>) {
        match self {
            Node::Deferred { slot } => slots.push(*slot),
            Node::Element { children, .. } => {
                for child in children {
                    child.collect_slots(slots);
                }
            }
            Node::Text { .. } => {}
        }
    }
}

// ============================================================================
// STREAM CHUNKS
// ============================================================================

/// Error categories carried by a terminal [`TreeChunk::Error`] frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamErrorCode {
    /// The record store could not be reached while rendering.
    StoreUnavailable,
    /// Any other server-side failure.
    InternalError,
}

/// One frame of a render stream.
///
/// A well-formed stream is one `Root`, zero or more `Resolve`, then exactly
/// one terminal `End` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeChunk {
    Root { node: Node },
    Resolve { slot: SlotId, node: Node },
    Error { code: StreamErrorCode, message: String },
    End,
}

impl TreeChunk {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TreeChunk::Error { .. } | TreeChunk::End)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::element("div")
            .attr("class", "main")
            .child(Node::element("h1").child(Node::text("Title")))
            .child(Node::deferred(SlotId(2)))
            .child(Node::text(" body"))
            .child(Node::deferred(SlotId(1)))
    }

    #[test]
    fn test_text_content_skips_deferred() {
        assert_eq!(sample().text_content(), "Title body");
    }

    #[test]
    fn test_deferred_slots_in_document_order() {
        assert_eq!(sample().deferred_slots(), vec![SlotId(2), SlotId(1)]);
    }

    #[test]
    fn test_builders_ignore_non_elements() {
        let node = Node::text("x").attr("a", "b").child(Node::text("y"));
        assert_eq!(node, Node::text("x"));
    }

    #[test]
    fn test_chunk_wire_shape() -> Result<(), serde_json::Error> {
        let chunk = TreeChunk::Resolve {
            slot: SlotId(1),
            node: Node::text("hi"),
        };
        let json = serde_json::to_value(&chunk)?;
        assert_eq!(json["type"], "resolve");
        assert_eq!(json["slot"], 1);
        assert_eq!(json["node"]["kind"], "text");

        let end = serde_json::to_string(&TreeChunk::End)?;
        assert_eq!(end, r#"{"type":"end"}"#);

        let err = serde_json::to_value(&TreeChunk::Error {
            code: StreamErrorCode::StoreUnavailable,
            message: "down".to_string(),
        })?;
        assert_eq!(err["code"], "STORE_UNAVAILABLE");
        Ok(())
    }

    #[test]
    fn test_terminal_chunks() {
        assert!(TreeChunk::End.is_terminal());
        assert!(!TreeChunk::Root { node: sample() }.is_terminal());
    }
}
