//! Error types for the history engine.
//!
//! Graph and content failures surface through [`HistoryError::Graph`]; the
//! rest cover the action state machine and the stack. An
//! [`InconsistentAggregate`](HistoryError::InconsistentAggregate) is fatal:
//! part of an aggregate has replayed and part has not, so callers should
//! treat the whole history as untrustworthy and reload model state.

use thiserror::Error;

use veza_graph::error::GraphError;

use crate::action::ActionState;

/// Errors produced by the veza-history crate.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The action is not in a state that permits the requested transition.
    #[error("cannot {op} an action in state {state}")]
    InvalidTransition { op: &'static str, state: ActionState },

    /// A frozen action has released its payload and cannot replay.
    #[error("action '{name}' is frozen")]
    FrozenAction { name: String },

    /// The captured previous value is gone.
    #[error("action '{name}' has no captured previous value")]
    MissingPreviousValue { name: String },

    /// Asked to aggregate more actions than the history holds.
    #[error("cannot aggregate {requested} actions: only {available} in history")]
    AggregateRange { requested: usize, available: usize },

    /// A child action failed partway through an aggregate undo/redo.
    #[error("aggregate '{name}' failed at child {position}: {source}")]
    InconsistentAggregate {
        name: String,
        position: usize,
        #[source]
        source: Box<HistoryError>,
    },

    /// A content or arena failure surfaced from the graph substrate.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
