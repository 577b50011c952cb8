//! The action stack.
//!
//! Records actions in application order, undoes and redoes them through a
//! [`ContentStore`], coalesces mergeable neighbors, aggregates recent
//! entries, bounds history depth, and drives dirty flags against a save
//! point.
//!
//! On any undo/redo error the stack's position is unchanged: an action only
//! moves between the done and undone lists after its toggle succeeded.

use std::rc::Rc;

use tracing::{debug, trace};

use veza_graph::content::{Content, ContentStore};
use veza_graph::id::NodeId;
use veza_graph::index::CellIndex;
use veza_graph::value::Value;

use crate::action::{Action, Mergeable, ValueChangeAction};
use crate::aggregate::AggregateAction;
use crate::dirty::Dirtiable;
use crate::error::HistoryError;

/// Default history depth.
const DEFAULT_MAX_DEPTH: usize = 100;

/// Linear undo/redo history with merge, aggregation, and dirty tracking.
#[derive(Debug)]
pub struct ActionStack {
    /// Applied actions, most recent last.
    done: Vec<Action>,
    /// Undone actions, most recent last. Cleared by every push.
    undone: Vec<Action>,
    /// History depth limit; zero means unlimited.
    max_depth: usize,
    /// Number of done actions at the last `mark_saved`; `None` when the
    /// saved state is no longer reachable through undo/redo.
    save_point: Option<usize>,
}

impl Default for ActionStack {
    fn default() -> Self {
        ActionStack::new()
    }
}

impl ActionStack {
    pub fn new() -> Self {
        ActionStack::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// `max_depth` of zero means unlimited history.
    pub fn with_max_depth(max_depth: usize) -> Self {
        ActionStack {
            done: Vec::new(),
            undone: Vec::new(),
            max_depth,
            save_point: Some(0),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    /// The most recently pushed entry, if any.
    pub fn last(&self) -> Option<&Action> {
        self.done.last()
    }

    /// Pushes an action, transitioning it `Created -> Done`.
    ///
    /// The most recently pushed entry is offered a merge with the new
    /// action first (in that order: the new action occurred after it); on
    /// success the stack keeps one entry instead of two. Pushing clears the
    /// redo list and trims history beyond the depth limit, freezing every
    /// discarded action.
    pub fn push(&mut self, mut action: Action) {
        action.mark_done();
        debug!(action = %action.name(), "push");

        // A save point sitting in the now-cleared redo region is gone.
        if let Some(save) = self.save_point {
            if save > self.done.len() {
                self.save_point = None;
            }
        }
        for mut invalidated in self.undone.drain(..) {
            invalidated.freeze();
        }

        let dirtiables = action.dirtiables();
        let mergeable = self.done.last().is_some_and(|last| last.can_merge(&action));
        if mergeable {
            if let Some(last) = self.done.last_mut() {
                trace!(action = %last.name(), "merged into previous");
                last.merge(action);
            }
        } else {
            self.done.push(action);
        }
        self.trim();
        self.notify(&dirtiables);
    }

    fn trim(&mut self) {
        if self.max_depth == 0 {
            return;
        }
        while self.done.len() > self.max_depth {
            let mut discarded = self.done.remove(0);
            discarded.freeze();
            self.save_point = match self.save_point {
                // The saved state fell off the end of history.
                Some(0) | None => None,
                Some(save) => Some(save - 1),
            };
        }
    }

    fn notify(&self, dirtiables: &[Rc<dyn Dirtiable>]) {
        let dirty = self.save_point != Some(self.done.len());
        for dirtiable in dirtiables {
            dirtiable.set_dirty(dirty);
        }
    }

    /// Undoes the most recent action. `Ok(false)` when there is nothing to
    /// undo.
    pub fn undo(&mut self, store: &mut dyn ContentStore) -> Result<bool, HistoryError> {
        let Some(mut action) = self.done.pop() else {
            return Ok(false);
        };
        if let Err(err) = action.undo(store) {
            self.done.push(action);
            return Err(err);
        }
        trace!(action = %action.name(), "undo");
        let dirtiables = action.dirtiables();
        self.undone.push(action);
        self.notify(&dirtiables);
        Ok(true)
    }

    /// Redoes the most recently undone action. `Ok(false)` when there is
    /// nothing to redo.
    pub fn redo(&mut self, store: &mut dyn ContentStore) -> Result<bool, HistoryError> {
        let Some(mut action) = self.undone.pop() else {
            return Ok(false);
        };
        if let Err(err) = action.redo(store) {
            self.undone.push(action);
            return Err(err);
        }
        trace!(action = %action.name(), "redo");
        let dirtiables = action.dirtiables();
        self.done.push(action);
        self.notify(&dirtiables);
        Ok(true)
    }

    /// Collapses the `count` most recent done actions into one aggregate
    /// (application order preserved) pushed back as a single done unit.
    pub fn aggregate_last(
        &mut self,
        count: usize,
        name: impl Into<String>,
        reverse_on_undo: bool,
    ) -> Result<(), HistoryError> {
        if count == 0 || count > self.done.len() {
            return Err(HistoryError::AggregateRange {
                requested: count,
                available: self.done.len(),
            });
        }
        let start = self.done.len() - count;
        // A save point inside the collapsed range is no longer addressable;
        // one right at the current position maps onto the aggregate.
        if let Some(save) = self.save_point {
            if save > start && save < self.done.len() {
                self.save_point = None;
            } else if save == self.done.len() {
                self.save_point = Some(start + 1);
            }
        }
        let items = self.done.split_off(start);
        let mut aggregate = AggregateAction::new(name, items, reverse_on_undo);
        aggregate.mark_done();
        debug!(count, aggregate = %aggregate.name(), "aggregated history tail");
        self.done.push(Action::Aggregate(aggregate));
        Ok(())
    }

    /// Marks the current state as saved: anchors the save point here and
    /// clears every tracked dirtiable.
    pub fn mark_saved(&mut self) {
        self.save_point = Some(self.done.len());
        for action in self.done.iter().chain(self.undone.iter()) {
            for dirtiable in action.dirtiables() {
                dirtiable.set_dirty(false);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Apply-and-record: perform the mutation and push its action in one step
    // -----------------------------------------------------------------------

    /// Updates a cell (or one of its elements) and records the change.
    pub fn apply_update(
        &mut self,
        store: &mut dyn ContentStore,
        cell: NodeId,
        index: Option<CellIndex>,
        value: Value,
        name: impl Into<String>,
        dirtiables: Vec<Rc<dyn Dirtiable>>,
    ) -> Result<(), HistoryError> {
        let content = store.content_mut(cell)?;
        let previous = content.retrieve(index.as_ref())?;
        content.update(value, index.as_ref())?;
        self.push(Action::Value(ValueChangeAction::value_change(
            name, cell, index, previous, dirtiables,
        )));
        Ok(())
    }

    /// Inserts a collection element and records the addition.
    pub fn apply_add(
        &mut self,
        store: &mut dyn ContentStore,
        cell: NodeId,
        index: CellIndex,
        value: Value,
        name: impl Into<String>,
        dirtiables: Vec<Rc<dyn Dirtiable>>,
    ) -> Result<(), HistoryError> {
        store.content_mut(cell)?.add(value, Some(&index))?;
        self.push(Action::Value(ValueChangeAction::collection_add(
            name, cell, index, dirtiables,
        )));
        Ok(())
    }

    /// Removes a collection element and records the removal.
    pub fn apply_remove(
        &mut self,
        store: &mut dyn ContentStore,
        cell: NodeId,
        index: CellIndex,
        name: impl Into<String>,
        dirtiables: Vec<Rc<dyn Dirtiable>>,
    ) -> Result<(), HistoryError> {
        let removed = store.content_mut(cell)?.remove(Some(&index))?;
        self.push(Action::Value(ValueChangeAction::collection_remove(
            name, cell, index, removed, dirtiables,
        )));
        Ok(())
    }
}
