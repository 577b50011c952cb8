//! Graph nodes and reference edges.
//!
//! A [`GraphNode`] wraps a content cell and exposes named, ordered children
//! plus at most one [`Reference`]. The reference kind -- single target vs
//! enumerable entries -- is a tagged enum matched exhaustively wherever the
//! two behave differently, and is fixed for the node's lifetime once set;
//! only the target(s) change afterwards.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::content::ValueContent;
use crate::id::NodeId;
use crate::index::CellIndex;
use crate::value::Value;

/// One entry of an enumerable reference: a position/key within the
/// referencing collection and an optional target node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub index: CellIndex,
    pub target: Option<NodeId>,
}

/// A reference edge from a node to other nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Reference {
    /// No reference edge.
    #[default]
    None,
    /// At most one target node.
    Single(Option<NodeId>),
    /// Ordered entries, each addressed by a collection index.
    Enumerable(Vec<ReferenceEntry>),
}

impl Reference {
    /// Returns the reference kind name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Reference::None => "none",
            Reference::Single(_) => "single",
            Reference::Enumerable(_) => "enumerable",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Reference::None)
    }

    /// The target of a single reference, flattened. `None` for an empty
    /// single reference and for the other kinds.
    pub fn single_target(&self) -> Option<NodeId> {
        match self {
            Reference::Single(target) => *target,
            _ => None,
        }
    }

    /// The entries of an enumerable reference; empty for the other kinds.
    pub fn entries(&self) -> &[ReferenceEntry] {
        match self {
            Reference::Enumerable(entries) => entries,
            _ => &[],
        }
    }

    /// The enumerable entry at `index`, if present.
    pub fn entry_at(&self, index: &CellIndex) -> Option<&ReferenceEntry> {
        self.entries().iter().find(|e| &e.index == index)
    }
}

/// An addressable unit in an object graph: a content cell, ordered named
/// children, and an optional reference edge.
///
/// Nodes are created and wired through
/// [`NodeGraph`](crate::graph::NodeGraph); sibling names are unique and
/// child order is the declaration order, which traversal follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    name: String,
    content: ValueContent,
    children: IndexMap<String, NodeId>,
    reference: Reference,
}

impl GraphNode {
    pub(crate) fn new(name: String, value: Value) -> Self {
        GraphNode {
            name,
            content: ValueContent::new(value),
            children: IndexMap::new(),
            reference: Reference::None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &ValueContent {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut ValueContent {
        &mut self.content
    }

    /// Named children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// The child with the given name, if any.
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub(crate) fn reference_mut(&mut self) -> &mut Reference {
        &mut self.reference
    }

    pub(crate) fn insert_child(&mut self, name: String, id: NodeId) {
        self.children.insert(name, id);
    }
}
