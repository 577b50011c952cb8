//! Dirty (unsaved-changes) tracking.
//!
//! A [`Dirtiable`] is any object whose "has unsaved changes" flag is driven
//! by action-stack transitions. Implementations use interior mutability and
//! are shared with actions through `Rc<dyn Dirtiable>` -- the single-writer
//! editor model, no threads involved.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// An object whose dirty flag the action stack toggles on push, undo, and
/// redo.
pub trait Dirtiable: fmt::Debug {
    fn set_dirty(&self, dirty: bool);
}

/// Stock [`Dirtiable`]: a shared boolean flag.
#[derive(Debug, Default)]
pub struct DirtyFlag {
    dirty: Cell<bool>,
}

impl DirtyFlag {
    pub fn new() -> Self {
        DirtyFlag::default()
    }

    /// A flag ready to be shared with actions and kept by the caller.
    pub fn shared() -> Rc<Self> {
        Rc::new(DirtyFlag::new())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }
}

impl Dirtiable for DirtyFlag {
    fn set_dirty(&self, dirty: bool) {
        self.dirty.set(dirty);
    }
}
