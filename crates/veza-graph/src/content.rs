//! The content cell abstraction.
//!
//! A content cell is a mutable value holder supporting retrieve/update/add/
//! remove with an optional [`CellIndex`]. The same four operations apply
//! whether the underlying value is a scalar, an object, or a collection --
//! the index is present only when one element is addressed, absent when the
//! operation targets the whole cell.
//!
//! [`ContentStore`] resolves cells from stable node handles. The history
//! engine mutates cells through it instead of holding aliased references, so
//! a cell's lifetime stays governed by the live graph, never by retained
//! history.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::id::NodeId;
use crate::index::CellIndex;
use crate::value::Value;

/// Mutable value holder addressed by an optional index.
///
/// Invariant: `update` followed by `retrieve` with the same index returns
/// the updated value, with no implicit coercion.
pub trait Content {
    /// Returns the whole value (no index) or one collection element.
    fn retrieve(&self, index: Option<&CellIndex>) -> Result<Value, GraphError>;

    /// Replaces the whole value (no index) or one existing collection slot.
    fn update(&mut self, value: Value, index: Option<&CellIndex>) -> Result<(), GraphError>;

    /// Inserts a new element: appends to a sequence (no index), inserts at a
    /// position, or adds a new key.
    fn add(&mut self, value: Value, index: Option<&CellIndex>) -> Result<(), GraphError>;

    /// Removes and returns the whole value (leaving `Null`) or one element,
    /// preserving the order of the remaining elements.
    fn remove(&mut self, index: Option<&CellIndex>) -> Result<Value, GraphError>;
}

/// Resolves content cells from stable node handles.
pub trait ContentStore {
    fn content(&self, id: NodeId) -> Result<&dyn Content, GraphError>;

    fn content_mut(&mut self, id: NodeId) -> Result<&mut dyn Content, GraphError>;
}

/// The in-memory content cell held by every graph node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueContent {
    value: Value,
}

impl ValueContent {
    pub fn new(value: Value) -> Self {
        ValueContent { value }
    }

    /// Read access to the whole value without going through [`Content`].
    pub fn value(&self) -> &Value {
        &self.value
    }
}

fn invalid(op: &'static str, reason: impl Into<String>) -> GraphError {
    GraphError::InvalidIndex {
        op,
        reason: reason.into(),
    }
}

impl Content for ValueContent {
    fn retrieve(&self, index: Option<&CellIndex>) -> Result<Value, GraphError> {
        match index {
            None => Ok(self.value.clone()),
            Some(CellIndex::Pos(p)) => match &self.value {
                Value::Seq(items) => items.get(*p).cloned().ok_or_else(|| {
                    invalid(
                        "retrieve",
                        format!(
                            "position {p} out of bounds for sequence of length {}",
                            items.len()
                        ),
                    )
                }),
                other => Err(invalid(
                    "retrieve",
                    format!("position {p} into {} value", other.kind()),
                )),
            },
            Some(CellIndex::Key(k)) => match &self.value {
                Value::Map(entries) => entries
                    .get(k)
                    .cloned()
                    .ok_or_else(|| invalid("retrieve", format!("key '{k}' not present"))),
                other => Err(invalid(
                    "retrieve",
                    format!("key '{k}' into {} value", other.kind()),
                )),
            },
        }
    }

    fn update(&mut self, value: Value, index: Option<&CellIndex>) -> Result<(), GraphError> {
        match index {
            None => {
                self.value = value;
                Ok(())
            }
            Some(CellIndex::Pos(p)) => match &mut self.value {
                Value::Seq(items) => {
                    let len = items.len();
                    let slot = items.get_mut(*p).ok_or_else(|| {
                        invalid(
                            "update",
                            format!("position {p} out of bounds for sequence of length {len}"),
                        )
                    })?;
                    *slot = value;
                    Ok(())
                }
                other => Err(invalid(
                    "update",
                    format!("position {p} into {} value", other.kind()),
                )),
            },
            Some(CellIndex::Key(k)) => match &mut self.value {
                Value::Map(entries) => match entries.get_mut(k) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(invalid("update", format!("key '{k}' not present"))),
                },
                other => Err(invalid(
                    "update",
                    format!("key '{k}' into {} value", other.kind()),
                )),
            },
        }
    }

    fn add(&mut self, value: Value, index: Option<&CellIndex>) -> Result<(), GraphError> {
        match index {
            None => match &mut self.value {
                Value::Seq(items) => {
                    items.push(value);
                    Ok(())
                }
                other => Err(invalid(
                    "add",
                    format!("append into {} value requires a sequence", other.kind()),
                )),
            },
            Some(CellIndex::Pos(p)) => match &mut self.value {
                Value::Seq(items) => {
                    if *p > items.len() {
                        return Err(invalid(
                            "add",
                            format!(
                                "position {p} out of bounds for sequence of length {}",
                                items.len()
                            ),
                        ));
                    }
                    items.insert(*p, value);
                    Ok(())
                }
                other => Err(invalid(
                    "add",
                    format!("position {p} into {} value", other.kind()),
                )),
            },
            Some(CellIndex::Key(k)) => match &mut self.value {
                Value::Map(entries) => {
                    if entries.contains_key(k) {
                        return Err(invalid("add", format!("key '{k}' already present")));
                    }
                    entries.insert(k.clone(), value);
                    Ok(())
                }
                other => Err(invalid(
                    "add",
                    format!("key '{k}' into {} value", other.kind()),
                )),
            },
        }
    }

    fn remove(&mut self, index: Option<&CellIndex>) -> Result<Value, GraphError> {
        match index {
            None => Ok(std::mem::take(&mut self.value)),
            Some(CellIndex::Pos(p)) => match &mut self.value {
                Value::Seq(items) => {
                    if *p >= items.len() {
                        return Err(invalid(
                            "remove",
                            format!(
                                "position {p} out of bounds for sequence of length {}",
                                items.len()
                            ),
                        ));
                    }
                    Ok(items.remove(*p))
                }
                other => Err(invalid(
                    "remove",
                    format!("position {p} into {} value", other.kind()),
                )),
            },
            Some(CellIndex::Key(k)) => match &mut self.value {
                Value::Map(entries) => entries
                    .shift_remove(k)
                    .ok_or_else(|| invalid("remove", format!("key '{k}' not present"))),
                other => Err(invalid(
                    "remove",
                    format!("key '{k}' into {} value", other.kind()),
                )),
            },
        }
    }
}
