//! Client-side render tree snapshots
//!
//! A [`RenderedTree`] is the state of one render stream after some prefix of
//! its chunks. Applying a chunk never mutates a snapshot; it produces the next
//! one, so a snapshot handed to the UI stays valid while the stream goes on.

use std::collections::BTreeMap;
use std::sync::Arc;

use vteacher_core::{Location, Node, SlotId, TreeChunk};

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTree {
    location: Location,
    root: Option<Arc<Node>>,
    slots: BTreeMap<SlotId, Arc<Node>>,
    complete: bool,
}

/// What a slot currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subtree<'a> {
    Resolved(&'a Node),
    Deferred(SlotId),
}

impl RenderedTree {
    /// An empty snapshot for the resolved `location`; nothing received yet.
    pub fn new(location: Location) -> Self {
        Self {
            location,
            root: None,
            slots: BTreeMap::new(),
            complete: false,
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    /// True once the terminal `End` frame has been applied.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn subtree(&self, slot: SlotId) -> Subtree<'_> {
        match self.slots.get(&slot) {
            Some(node) => Subtree::Resolved(node),
            None => Subtree::Deferred(slot),
        }
    }

    /// Slots referenced by the received tree that have not been resolved yet.
    pub fn unresolved_slots(&self) -> Vec<SlotId> {
        let mut referenced = Vec::new();
        if let Some(root) = &self.root {
            referenced.extend(root.deferred_slots());
        }
        for node in self.slots.values() {
            referenced.extend(node.deferred_slots());
        }
        referenced.retain(|slot| !self.slots.contains_key(slot));
        referenced.sort();
        referenced.dedup();
        referenced
    }

    /// Produce the snapshot that follows `chunk`.
    ///
    /// An `Error` frame turns into the error it carries. Frames that break
    /// the stream grammar (resolve before root, duplicate root or slot,
    /// anything after `End`) are `InvalidResponse`.
    pub fn apply(&self, chunk: TreeChunk) -> Result<RenderedTree, ClientError> {
        if self.complete {
            return Err(ClientError::InvalidResponse(
                "frame received after end of stream".to_string(),
            ));
        }
        let mut next = self.clone();
        match chunk {
            TreeChunk::Root { node } => {
                if next.root.is_some() {
                    return Err(ClientError::InvalidResponse("duplicate root frame".to_string()));
                }
                next.root = Some(Arc::new(node));
            }
            TreeChunk::Resolve { slot, node } => {
                if next.root.is_none() {
                    return Err(ClientError::InvalidResponse(format!(
                        "slot {} resolved before root",
                        slot
                    )));
                }
                // A resolved subtree may only point at slots still pending,
                // which keeps the slot graph acyclic.
                if let Some(nested) = node
                    .deferred_slots()
                    .into_iter()
                    .find(|nested| *nested == slot || next.slots.contains_key(nested))
                {
                    return Err(ClientError::InvalidResponse(format!(
                        "slot {} refers to already resolved slot {}",
                        slot, nested
                    )));
                }
                if next.slots.insert(slot, Arc::new(node)).is_some() {
                    return Err(ClientError::InvalidResponse(format!(
                        "slot {} resolved twice",
                        slot
                    )));
                }
            }
            TreeChunk::Error { code, message } => {
                return Err(ClientError::from_stream_error(code, message));
            }
            TreeChunk::End => {
                if next.root.is_none() {
                    return Err(ClientError::InvalidResponse("stream ended without root".to_string()));
                }
                if let Some(slot) = next.unresolved_slots().first() {
                    return Err(ClientError::InvalidResponse(format!(
                        "stream ended with slot {} unresolved",
                        slot
                    )));
                }
                next.complete = true;
            }
        }
        Ok(next)
    }

    /// The tree with every resolved slot inlined. Unresolved slots stay
    /// `Deferred`.
    pub fn materialize(&self) -> Option<Node> {
        self.root.as_deref().map(|root| self.inline(root))
    }

    fn inline(&self, node: &Node) -> Node {
        match node {
            Node::Deferred { slot } => match self.slots.get(slot) {
                Some(resolved) => self.inline(resolved),
                None => node.clone(),
            },
            Node::Element {
                tag,
                attrs,
                children,
            } => Node::Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: children.iter().map(|child| self.inline(child)).collect(),
            },
            Node::Text { .. } => node.clone(),
        }
    }

    /// Visible text of the whole screen.
    pub fn text_content(&self) -> String {
        self.materialize()
            .map(|node| node.text_content())
            .unwrap_or_default()
    }
}

/// Indented outline of a node, one element or text per line.
pub fn render_outline(node: &Node) -> String {
    let mut out = String::new();
    write_outline(node, 0, &mut out);
    out
}

fn write_outline(node: &Node, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match node {
        Node::Element {
            tag,
            attrs,
            children,
        } => {
            out.push_str(&indent);
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push_str(&format!(" {}=\"{}\"", name, value));
            }
            out.push_str(">\n");
            for child in children {
                write_outline(child, depth + 1, out);
            }
        }
        Node::Text { text } => {
            out.push_str(&indent);
            out.push_str(text);
            out.push('\n');
        }
        Node::Deferred { slot } => {
            out.push_str(&format!("{}(loading {})\n", indent, slot));
        }
    }
}
