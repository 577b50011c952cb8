//! The node arena.
//!
//! [`NodeGraph`] owns every node of one editing session. Handles are
//! append-only `u32` indexes that never move or get reused, so identity
//! comparisons and identity-keyed maps stay valid for the arena's lifetime.
//! All structural mutations go through arena methods, which enforce sibling
//! name uniqueness and reference-kind immutability.
//!
//! Several independent hierarchies may live in one arena -- a prototype
//! hierarchy and one derived from it, say -- and the
//! [`GraphLinker`](crate::link::GraphLinker) pairs two of them.

use serde::{Deserialize, Serialize};

use crate::content::{Content, ContentStore};
use crate::error::GraphError;
use crate::id::NodeId;
use crate::index::CellIndex;
use crate::node::{GraphNode, Reference, ReferenceEntry};
use crate::value::Value;

/// Arena of graph nodes addressed by [`NodeId`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeGraph {
    nodes: Vec<GraphNode>,
}

impl NodeGraph {
    pub fn new() -> Self {
        NodeGraph::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Creates a detached node and returns its handle.
    pub fn add_node(&mut self, name: impl Into<String>, value: Value) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GraphNode::new(name.into(), value));
        id
    }

    /// Resolves a handle, failing on a dangling one.
    pub fn node(&self, id: NodeId) -> Result<&GraphNode, GraphError> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(GraphError::NodeNotFound { id })
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut GraphNode, GraphError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(GraphError::NodeNotFound { id })
    }

    /// Resolves a handle, `None` on a dangling one.
    pub fn get(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Attaches an existing node as a child of `parent`, keyed by the
    /// child's own name. Sibling names must be unique.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        let name = self.node(child)?.name().to_string();
        if self.node(parent)?.child(&name).is_some() {
            return Err(GraphError::DuplicateChild { parent, name });
        }
        self.node_mut(parent)?.insert_child(name, child);
        Ok(())
    }

    /// Creates a node and attaches it under `parent` in one step.
    pub fn add_child_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        value: Value,
    ) -> Result<NodeId, GraphError> {
        let name = name.into();
        if self.node(parent)?.child(&name).is_some() {
            return Err(GraphError::DuplicateChild { parent, name });
        }
        let child = self.add_node(name.clone(), value);
        self.node_mut(parent)?.insert_child(name, child);
        Ok(child)
    }

    /// The child of `parent` with the given name, if both resolve.
    pub fn get_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get(parent).and_then(|node| node.child(name))
    }

    /// Points the node's single reference at `target`. The first call fixes
    /// the node's reference kind as single.
    pub fn set_single_target(
        &mut self,
        node: NodeId,
        target: Option<NodeId>,
    ) -> Result<(), GraphError> {
        if let Some(t) = target {
            self.node(t)?;
        }
        let reference = self.node_mut(node)?.reference_mut();
        match reference {
            Reference::Single(slot) => *slot = target,
            Reference::Enumerable(_) => {
                return Err(GraphError::ReferenceKindMismatch {
                    id: node,
                    expected: "single",
                    found: "enumerable",
                })
            }
            Reference::None => *reference = Reference::Single(target),
        }
        Ok(())
    }

    /// Points the enumerable entry at `index` at `target`, appending the
    /// entry if it does not exist yet. The first call fixes the node's
    /// reference kind as enumerable.
    pub fn set_indexed_target(
        &mut self,
        node: NodeId,
        index: CellIndex,
        target: Option<NodeId>,
    ) -> Result<(), GraphError> {
        if let Some(t) = target {
            self.node(t)?;
        }
        let reference = self.node_mut(node)?.reference_mut();
        match reference {
            Reference::Enumerable(entries) => match entries.iter_mut().find(|e| e.index == index) {
                Some(entry) => entry.target = target,
                None => entries.push(ReferenceEntry { index, target }),
            },
            Reference::Single(_) => {
                return Err(GraphError::ReferenceKindMismatch {
                    id: node,
                    expected: "enumerable",
                    found: "single",
                })
            }
            Reference::None => {
                *reference = Reference::Enumerable(vec![ReferenceEntry { index, target }])
            }
        }
        Ok(())
    }

    /// All handles in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }
}

impl ContentStore for NodeGraph {
    fn content(&self, id: NodeId) -> Result<&dyn Content, GraphError> {
        Ok(self.node(id)?.content())
    }

    fn content_mut(&mut self, id: NodeId) -> Result<&mut dyn Content, GraphError> {
        Ok(self.node_mut(id)?.content_mut())
    }
}
