//! Composite action items.
//!
//! An [`AggregateAction`] groups an ordered list of actions as one undo/redo
//! unit. Children are owned, so an aggregate is a tree by construction and
//! cannot contain itself, directly or transitively.

use std::rc::Rc;

use veza_graph::content::ContentStore;

use crate::action::{next_action_id, Action, ActionId, ActionState};
use crate::dirty::Dirtiable;
use crate::error::HistoryError;

/// An ordered group of actions undone and redone as one unit.
#[derive(Debug)]
pub struct AggregateAction {
    id: ActionId,
    name: String,
    items: Vec<Action>,
    reverse_on_undo: bool,
    state: ActionState,
}

impl AggregateAction {
    /// Groups `items`, given in application order. Pass `reverse_on_undo =
    /// true` unless the members must be undone in their original order, an
    /// advanced case.
    pub fn new(name: impl Into<String>, items: Vec<Action>, reverse_on_undo: bool) -> Self {
        AggregateAction {
            id: next_action_id(),
            name: name.into(),
            items,
            reverse_on_undo,
            state: ActionState::Created,
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn reverse_on_undo(&self) -> bool {
        self.reverse_on_undo
    }

    pub fn set_reverse_on_undo(&mut self, reverse: bool) {
        self.reverse_on_undo = reverse;
    }

    /// The grouped actions, in application order.
    pub fn items(&self) -> &[Action] {
        &self.items
    }

    pub(crate) fn mark_done(&mut self) {
        if self.state == ActionState::Created {
            self.state = ActionState::Done;
        }
        for item in &mut self.items {
            item.mark_done();
        }
    }

    /// Undoes every child, in reverse application order when
    /// `reverse_on_undo`, else forward.
    ///
    /// A failing child is fatal: the aggregate is left partially undone and
    /// [`HistoryError::InconsistentAggregate`] reports the failing position.
    pub fn undo(&mut self, store: &mut dyn ContentStore) -> Result<(), HistoryError> {
        if self.state != ActionState::Done {
            return Err(HistoryError::InvalidTransition {
                op: "undo",
                state: self.state,
            });
        }
        self.replay(store, self.reverse_on_undo, true)?;
        self.state = ActionState::Undone;
        Ok(())
    }

    /// Redoes every child in the opposite order [`undo`](Self::undo) used,
    /// restoring the original forward causal order.
    pub fn redo(&mut self, store: &mut dyn ContentStore) -> Result<(), HistoryError> {
        if self.state != ActionState::Undone {
            return Err(HistoryError::InvalidTransition {
                op: "redo",
                state: self.state,
            });
        }
        self.replay(store, !self.reverse_on_undo, false)?;
        self.state = ActionState::Done;
        Ok(())
    }

    fn replay(
        &mut self,
        store: &mut dyn ContentStore,
        reverse: bool,
        undo: bool,
    ) -> Result<(), HistoryError> {
        let count = self.items.len();
        for i in 0..count {
            let position = if reverse { count - 1 - i } else { i };
            let result = if undo {
                self.items[position].undo(store)
            } else {
                self.items[position].redo(store)
            };
            if let Err(source) = result {
                return Err(HistoryError::InconsistentAggregate {
                    name: self.name.clone(),
                    position,
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }

    /// Whether the given action is contained in this aggregate, recursively
    /// through nested aggregates.
    pub fn contains_action(&self, id: ActionId) -> bool {
        self.items.iter().any(|item| item.contains_action(id))
    }

    /// Freezes every contained action.
    pub fn freeze(&mut self) {
        for item in &mut self.items {
            item.freeze();
        }
    }

    pub(crate) fn dirtiables(&self) -> Vec<Rc<dyn Dirtiable>> {
        self.items.iter().flat_map(|item| item.dirtiables()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ValueChangeAction;
    use veza_graph::content::Content;
    use veza_graph::graph::NodeGraph;
    use veza_graph::id::NodeId;
    use veza_graph::value::Value;

    /// Applies `update(value)` to the cell and returns the recording action.
    fn update(graph: &mut NodeGraph, cell: NodeId, value: Value) -> Action {
        let previous = graph.content_mut(cell).unwrap().retrieve(None).unwrap();
        graph.content_mut(cell).unwrap().update(value, None).unwrap();
        Action::Value(ValueChangeAction::value_change(
            "update",
            cell,
            None,
            previous,
            Vec::new(),
        ))
    }

    fn current(graph: &NodeGraph, cell: NodeId) -> Value {
        graph.content(cell).unwrap().retrieve(None).unwrap()
    }

    #[test]
    fn reverse_undo_restores_the_initial_state() {
        let mut graph = NodeGraph::new();
        let cell = graph.add_node("text", Value::from("v0"));
        // Two chained edits to one cell: order of undo is observable.
        let a1 = update(&mut graph, cell, Value::from("v1"));
        let a2 = update(&mut graph, cell, Value::from("v2"));

        let mut aggregate = AggregateAction::new("edit", vec![a1, a2], true);
        aggregate.mark_done();

        aggregate.undo(&mut graph).unwrap();
        assert_eq!(current(&graph, cell), Value::from("v0"));
        assert_eq!(aggregate.state(), ActionState::Undone);

        aggregate.redo(&mut graph).unwrap();
        assert_eq!(current(&graph, cell), Value::from("v2"));
        assert_eq!(aggregate.state(), ActionState::Done);
    }

    #[test]
    fn forward_undo_order_when_reverse_is_disabled() {
        let mut graph = NodeGraph::new();
        let cell = graph.add_node("text", Value::from("v0"));
        let a1 = update(&mut graph, cell, Value::from("v1"));
        let a2 = update(&mut graph, cell, Value::from("v2"));

        let mut aggregate = AggregateAction::new("edit", vec![a1, a2], false);
        aggregate.mark_done();

        // Forward order undoes the first edit before the second, so the
        // second edit's capture ("v1") lands last.
        aggregate.undo(&mut graph).unwrap();
        assert_eq!(current(&graph, cell), Value::from("v1"));

        aggregate.redo(&mut graph).unwrap();
        assert_eq!(current(&graph, cell), Value::from("v2"));
    }

    #[test]
    fn partial_failure_is_inconsistent_aggregate() {
        let mut graph = NodeGraph::new();
        let cell = graph.add_node("text", Value::from("v0"));
        let a1 = update(&mut graph, cell, Value::from("v1"));
        let mut poisoned = update(&mut graph, cell, Value::from("v2"));
        poisoned.freeze();

        let mut aggregate = AggregateAction::new("edit", vec![a1, poisoned], true);
        aggregate.mark_done();

        let err = aggregate.undo(&mut graph).unwrap_err();
        match err {
            HistoryError::InconsistentAggregate { position, .. } => assert_eq!(position, 1),
            other => unreachable!("unexpected error: {other}"),
        }
        // The aggregate did not silently continue past the failure.
        assert_eq!(current(&graph, cell), Value::from("v2"));
    }

    #[test]
    fn undo_requires_done_state() {
        let mut graph = NodeGraph::new();
        let mut aggregate = AggregateAction::new("empty", Vec::new(), true);
        let err = aggregate.undo(&mut graph).unwrap_err();
        assert!(matches!(err, HistoryError::InvalidTransition { op: "undo", .. }));
    }
}
