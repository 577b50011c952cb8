//! Error types for the graph substrate.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the arena, the content cells, and the traversal engine.

use thiserror::Error;

use crate::id::NodeId;

/// Errors produced by the veza-graph crate.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node handle does not resolve in the arena. Also the failure mode of
    /// traversal or linking started from a dangling root.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// A child with the same name already exists under the parent.
    #[error("duplicate child '{name}' under NodeId({parent})", parent = parent.0)]
    DuplicateChild { parent: NodeId, name: String },

    /// A reference mutation does not match the kind the node was given when
    /// its reference was first set.
    #[error(
        "reference kind mismatch on NodeId({id}): expected {expected}, found {found}",
        id = id.0
    )]
    ReferenceKindMismatch {
        id: NodeId,
        expected: &'static str,
        found: &'static str,
    },

    /// An index is absent or incompatible with the cell's current shape.
    #[error("invalid index in {op}: {reason}")]
    InvalidIndex { op: &'static str, reason: String },
}
