//! Object-model editing substrate: addressable node graphs over content
//! cells, cycle-safe traversal with canonical paths, and node-by-node
//! linking of two structurally related hierarchies.
//!
//! The companion crate `veza-history` builds reversible editing history on
//! top of the [`content::ContentStore`] handle surface exposed here.

pub mod content;
pub mod error;
pub mod graph;
pub mod id;
pub mod index;
pub mod link;
pub mod node;
pub mod path;
pub mod value;
pub mod visit;

// Re-export commonly used types
pub use content::{Content, ContentStore, ValueContent};
pub use error::GraphError;
pub use graph::NodeGraph;
pub use id::NodeId;
pub use index::CellIndex;
pub use link::{
    Correspondence, GraphLinker, IndexedReferenceMatch, MatchStrategy, ReferenceMatchStrategy,
    SeededMatch,
};
pub use node::{GraphNode, Reference, ReferenceEntry};
pub use path::{NodePath, PathStep};
pub use value::Value;
pub use visit::{GraphVisitor, PathCollector, VisitHooks};
