//! Stable ID newtype for graph nodes.
//!
//! Node identity is an arena handle: a `NodeId` is assigned when the node is
//! created in a [`NodeGraph`](crate::graph::NodeGraph) and is never reused.
//! Identity-keyed maps (the traversal visited set, the linker correspondence
//! map) key on this handle instead of reference equality, so identity stays
//! stable across clones and serialization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier. Indexes into the owning arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
