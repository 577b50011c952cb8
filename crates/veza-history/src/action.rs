//! Reversible action items.
//!
//! A [`ValueChangeAction`] is an atomic record of one content mutation. Its
//! undo and redo are the same symmetric toggle: every toggle swaps the
//! captured state with the live state, so the record is always one toggle
//! away from reverting or restoring the mutation. The toggle is implemented
//! once and shared by both transitions -- redo is not "run undo again" by
//! accident but by the invariant that each toggle prepares its own inverse.
//!
//! [`Action`] is the tagged sum of single changes and
//! [`AggregateAction`](crate::aggregate::AggregateAction) groups, dispatched
//! exhaustively.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;
use tracing::trace;

use veza_graph::content::{Content, ContentStore};
use veza_graph::id::NodeId;
use veza_graph::index::CellIndex;
use veza_graph::value::Value;

use crate::aggregate::AggregateAction;
use crate::dirty::Dirtiable;
use crate::error::HistoryError;

/// Unique identity of an action item, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(u64);

static NEXT_ACTION_ID: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_action_id() -> ActionId {
    ActionId(NEXT_ACTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// The kind of content change an action records.
///
/// A tagged enum matched exhaustively: an unsupported kind cannot be
/// constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    ValueChange,
    CollectionAdd,
    CollectionRemove,
}

/// Lifecycle state of an action item.
///
/// `Created -> Done` when pushed, then `Done <-> Undone` through the
/// symmetric toggle. Freezing is an orthogonal flag, not a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Created,
    Done,
    Undone,
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionState::Created => "created",
            ActionState::Done => "done",
            ActionState::Undone => "undone",
        })
    }
}

/// Operations that may coalesce with a later operation of the same shape.
pub trait Mergeable {
    /// Whether `next` can fold into `self`. `next` is the operation that
    /// occurred after `self`.
    fn can_merge(&self, next: &Self) -> bool;

    /// Folds `next` into `self`. Call only after [`can_merge`](Self::can_merge).
    fn merge(&mut self, next: Self);
}

pub(crate) type Dirtiables = SmallVec<[Rc<dyn Dirtiable>; 2]>;

/// An atomic, reversible record of one content mutation.
///
/// Holds a back-reference (`NodeId`) to the cell it mutated, never the cell
/// itself; the cell's lifetime belongs to the live graph.
#[derive(Debug)]
pub struct ValueChangeAction {
    id: ActionId,
    name: String,
    cell: NodeId,
    kind: ChangeKind,
    index: Option<CellIndex>,
    previous: Option<Value>,
    state: ActionState,
    frozen: bool,
    pub(crate) dirtiables: Dirtiables,
}

impl ValueChangeAction {
    /// Records a whole-cell or element value change; `previous` is the
    /// value the cell held before the mutation.
    pub fn value_change(
        name: impl Into<String>,
        cell: NodeId,
        index: Option<CellIndex>,
        previous: Value,
        dirtiables: Vec<Rc<dyn Dirtiable>>,
    ) -> Self {
        Self::with_kind(
            name.into(),
            cell,
            ChangeKind::ValueChange,
            index,
            Some(previous),
            dirtiables,
        )
    }

    /// Records an element insertion at `index`. The previous value is
    /// captured lazily on the first toggle, from the live collection.
    pub fn collection_add(
        name: impl Into<String>,
        cell: NodeId,
        index: CellIndex,
        dirtiables: Vec<Rc<dyn Dirtiable>>,
    ) -> Self {
        Self::with_kind(
            name.into(),
            cell,
            ChangeKind::CollectionAdd,
            Some(index),
            None,
            dirtiables,
        )
    }

    /// Records an element removal at `index`; `removed` is the element
    /// taken out of the collection.
    pub fn collection_remove(
        name: impl Into<String>,
        cell: NodeId,
        index: CellIndex,
        removed: Value,
        dirtiables: Vec<Rc<dyn Dirtiable>>,
    ) -> Self {
        Self::with_kind(
            name.into(),
            cell,
            ChangeKind::CollectionRemove,
            Some(index),
            Some(removed),
            dirtiables,
        )
    }

    fn with_kind(
        name: String,
        cell: NodeId,
        kind: ChangeKind,
        index: Option<CellIndex>,
        previous: Option<Value>,
        dirtiables: Vec<Rc<dyn Dirtiable>>,
    ) -> Self {
        ValueChangeAction {
            id: next_action_id(),
            name,
            cell,
            kind,
            index,
            previous,
            state: ActionState::Created,
            frozen: false,
            dirtiables: dirtiables.into_iter().collect(),
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self) -> NodeId {
        self.cell
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn index(&self) -> Option<&CellIndex> {
        self.index.as_ref()
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn mark_done(&mut self) {
        if self.state == ActionState::Created {
            self.state = ActionState::Done;
        }
    }

    /// Reverts the recorded mutation. From `Done` this transitions to
    /// `Undone`; invoked again from `Undone` it acts as the symmetric
    /// inverse and restores the mutation, equivalent to [`redo`](Self::redo).
    pub fn undo(&mut self, store: &mut dyn ContentStore) -> Result<(), HistoryError> {
        match self.state {
            ActionState::Created => Err(HistoryError::InvalidTransition {
                op: "undo",
                state: self.state,
            }),
            ActionState::Done | ActionState::Undone => self.toggle(store),
        }
    }

    /// Replays the recorded mutation; valid only from `Undone`.
    pub fn redo(&mut self, store: &mut dyn ContentStore) -> Result<(), HistoryError> {
        if self.state != ActionState::Undone {
            return Err(HistoryError::InvalidTransition {
                op: "redo",
                state: self.state,
            });
        }
        self.toggle(store)
    }

    /// The symmetric inverse. A failed toggle leaves both the cell and this
    /// action unchanged.
    fn toggle(&mut self, store: &mut dyn ContentStore) -> Result<(), HistoryError> {
        if self.frozen {
            return Err(HistoryError::FrozenAction {
                name: self.name.clone(),
            });
        }
        let content = store.content_mut(self.cell)?;
        match self.kind {
            ChangeKind::ValueChange => {
                let current = content.retrieve(self.index.as_ref())?;
                let previous = self.previous.take().ok_or_else(|| {
                    HistoryError::MissingPreviousValue {
                        name: self.name.clone(),
                    }
                })?;
                // retrieve succeeded for this index, so update cannot fail
                content.update(previous, self.index.as_ref())?;
                self.previous = Some(current);
            }
            ChangeKind::CollectionAdd => {
                let removed = content.remove(self.index.as_ref())?;
                self.previous = Some(removed);
                self.kind = ChangeKind::CollectionRemove;
            }
            ChangeKind::CollectionRemove => {
                let element = self.previous.clone().ok_or_else(|| {
                    HistoryError::MissingPreviousValue {
                        name: self.name.clone(),
                    }
                })?;
                content.add(element, self.index.as_ref())?;
                self.previous = None;
                self.kind = ChangeKind::CollectionAdd;
            }
        }
        self.state = match self.state {
            ActionState::Undone => ActionState::Done,
            _ => ActionState::Undone,
        };
        trace!(action = %self.name, state = %self.state, "toggled");
        Ok(())
    }

    /// Releases the captured payload once no further undo is expected; the
    /// action refuses to toggle afterwards. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.previous = None;
        self.index = None;
    }
}

impl Mergeable for ValueChangeAction {
    fn can_merge(&self, next: &Self) -> bool {
        !self.frozen
            && !next.frozen
            && self.kind == ChangeKind::ValueChange
            && next.kind == ChangeKind::ValueChange
            && self.cell == next.cell
            && self.index == next.index
    }

    fn merge(&mut self, next: Self) {
        // The receiver keeps its captured value: the state before either
        // change. The cell already holds the latest value, so `next` only
        // contributes its dirtiables.
        for dirtiable in next.dirtiables {
            if !self.dirtiables.iter().any(|d| Rc::ptr_eq(d, &dirtiable)) {
                self.dirtiables.push(dirtiable);
            }
        }
    }
}

/// A reversible history entry: a single content change or an aggregate.
#[derive(Debug)]
pub enum Action {
    Value(ValueChangeAction),
    Aggregate(AggregateAction),
}

impl Action {
    pub fn id(&self) -> ActionId {
        match self {
            Action::Value(action) => action.id(),
            Action::Aggregate(aggregate) => aggregate.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Action::Value(action) => action.name(),
            Action::Aggregate(aggregate) => aggregate.name(),
        }
    }

    pub fn state(&self) -> ActionState {
        match self {
            Action::Value(action) => action.state(),
            Action::Aggregate(aggregate) => aggregate.state(),
        }
    }

    pub(crate) fn mark_done(&mut self) {
        match self {
            Action::Value(action) => action.mark_done(),
            Action::Aggregate(aggregate) => aggregate.mark_done(),
        }
    }

    pub fn undo(&mut self, store: &mut dyn ContentStore) -> Result<(), HistoryError> {
        match self {
            Action::Value(action) => action.undo(store),
            Action::Aggregate(aggregate) => aggregate.undo(store),
        }
    }

    pub fn redo(&mut self, store: &mut dyn ContentStore) -> Result<(), HistoryError> {
        match self {
            Action::Value(action) => action.redo(store),
            Action::Aggregate(aggregate) => aggregate.redo(store),
        }
    }

    pub fn freeze(&mut self) {
        match self {
            Action::Value(action) => action.freeze(),
            Action::Aggregate(aggregate) => aggregate.freeze(),
        }
    }

    /// Whether this entry is, or transitively contains, the given action.
    pub fn contains_action(&self, id: ActionId) -> bool {
        match self {
            Action::Value(action) => action.id() == id,
            Action::Aggregate(aggregate) => aggregate.id() == id || aggregate.contains_action(id),
        }
    }

    /// This action plus, recursively, everything an aggregate contains.
    pub fn inner_items(&self) -> Vec<&Action> {
        let mut out = Vec::new();
        self.collect_inner(&mut out);
        out
    }

    fn collect_inner<'a>(&'a self, out: &mut Vec<&'a Action>) {
        out.push(self);
        if let Action::Aggregate(aggregate) = self {
            for item in aggregate.items() {
                item.collect_inner(out);
            }
        }
    }

    pub(crate) fn dirtiables(&self) -> Vec<Rc<dyn Dirtiable>> {
        match self {
            Action::Value(action) => action.dirtiables.iter().cloned().collect(),
            Action::Aggregate(aggregate) => aggregate.dirtiables(),
        }
    }
}

impl Mergeable for Action {
    fn can_merge(&self, next: &Self) -> bool {
        match (self, next) {
            (Action::Value(receiver), Action::Value(next)) => receiver.can_merge(next),
            _ => false,
        }
    }

    fn merge(&mut self, next: Self) {
        if let (Action::Value(receiver), Action::Value(next)) = (self, next) {
            receiver.merge(next);
        }
    }
}
