//! Canonical node paths.
//!
//! A [`NodePath`] records how a node was reached from a traversal root:
//! member steps into named children, target steps across single references,
//! and index steps across enumerable reference entries. Paths describe the
//! route, not a stored attribute of the node -- two traversals may reach a
//! shared node by different routes, and the first reachable path wins under
//! the visitor's visited-once rule.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::NodeId;
use crate::index::CellIndex;

/// One step of a node path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStep {
    /// Descend into the named child.
    Member(String),
    /// Follow the single-reference edge.
    Target,
    /// Follow the enumerable-reference entry at this index.
    Index(CellIndex),
}

/// The canonical path from a traversal root to a visited node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePath {
    root: NodeId,
    steps: SmallVec<[PathStep; 4]>,
}

impl NodePath {
    /// An empty path anchored at `root`.
    pub fn new(root: NodeId) -> Self {
        NodePath {
            root,
            steps: SmallVec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// A new path extended by a member step; `self` is unchanged.
    pub fn push_member(&self, name: &str) -> NodePath {
        let mut next = self.clone();
        next.steps.push(PathStep::Member(name.to_string()));
        next
    }

    /// A new path extended by a single-reference target step.
    pub fn push_target(&self) -> NodePath {
        let mut next = self.clone();
        next.steps.push(PathStep::Target);
        next
    }

    /// A new path extended by an enumerable-reference index step.
    pub fn push_index(&self, index: CellIndex) -> NodePath {
        let mut next = self.clone();
        next.steps.push(PathStep::Index(index));
        next
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.root.0)?;
        for step in &self.steps {
            match step {
                PathStep::Member(name) => write!(f, ".{name}")?,
                PathStep::Target => write!(f, ".*")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_does_not_mutate_the_original() {
        let base = NodePath::new(NodeId(0));
        let extended = base.push_member("child");
        assert!(base.is_empty());
        assert_eq!(extended.len(), 1);
        assert_eq!(extended.steps()[0], PathStep::Member("child".into()));
    }

    #[test]
    fn display_renders_all_step_kinds() {
        let path = NodePath::new(NodeId(3))
            .push_member("items")
            .push_index(CellIndex::Pos(2))
            .push_target()
            .push_member("position");
        assert_eq!(format!("{path}"), "#3.items[2].*.position");
    }

    #[test]
    fn display_key_index() {
        let path = NodePath::new(NodeId(0)).push_index(CellIndex::Key("left".into()));
        assert_eq!(format!("{path}"), "#0['left']");
    }

    #[test]
    fn serde_roundtrip() {
        let path = NodePath::new(NodeId(1)).push_member("a").push_target();
        let json = serde_json::to_string(&path).unwrap();
        let back: NodePath = serde_json::from_str(&json).unwrap();
        assert_eq!(path, back);
    }
}
