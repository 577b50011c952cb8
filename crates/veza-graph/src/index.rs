//! Index values addressing collection elements.
//!
//! A [`CellIndex`] names one element inside a collection-shaped content
//! cell: a position in a sequence or a key in a map. The same type keys the
//! entries of an enumerable reference and appears as a step payload in node
//! paths. Content operations take `Option<&CellIndex>` -- `None` means "the
//! whole cell".

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position or key of one collection element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellIndex {
    /// Position within a sequence.
    Pos(usize),
    /// Key within a map.
    Key(String),
}

impl CellIndex {
    pub fn as_pos(&self) -> Option<usize> {
        match self {
            CellIndex::Pos(p) => Some(*p),
            CellIndex::Key(_) => None,
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            CellIndex::Pos(_) => None,
            CellIndex::Key(k) => Some(k),
        }
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellIndex::Pos(p) => write!(f, "{p}"),
            CellIndex::Key(k) => write!(f, "'{k}'"),
        }
    }
}

impl From<usize> for CellIndex {
    fn from(p: usize) -> Self {
        CellIndex::Pos(p)
    }
}

impl From<&str> for CellIndex {
    fn from(k: &str) -> Self {
        CellIndex::Key(k.to_string())
    }
}

impl From<String> for CellIndex {
    fn from(k: String) -> Self {
        CellIndex::Key(k)
    }
}
