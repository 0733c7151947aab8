// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owner instances.

use alloc::rc::{Rc, Weak};
use core::fmt;

use crate::callback::{GlobalCallback, HasGlobalCallbacks, MaybeObservable};
use crate::id::ObjectId;
use crate::table::PropertyTable;

/// An object carrying callback properties.
///
/// A `CallbackObject` is a cheap shared handle; clones refer to the same
/// object. When the last handle is dropped the object's state (stored values,
/// listeners and global callbacks) is removed from its table. Descriptors such as
/// [`CallbackProperty`](crate::CallbackProperty) and
/// [`DictProperty`](crate::DictProperty) take it as their instance argument.
///
/// The object is itself observable: its global callbacks run after every
/// notification of any of its properties. Storing an object in a
/// [`CallbackDict`](crate::CallbackDict) therefore propagates changes of the
/// object to the dict's owner.
///
/// ```rust
/// use core::cell::Cell;
/// use std::rc::Rc;
/// use understory_callback::{GlobalCallback, HasGlobalCallbacks, PropertyRegistry, PropertyTable};
///
/// let mut registry = PropertyRegistry::new();
/// let label = registry.callback_property("label", String::new());
///
/// let table = PropertyTable::new();
/// let object = table.create_object();
///
/// let changes = Rc::new(Cell::new(0));
/// let callback = {
///     let changes = changes.clone();
///     GlobalCallback::new(move || changes.set(changes.get() + 1))
/// };
/// object.add_global_callback(callback.clone());
///
/// label.set(&object, "hello".into());
/// assert_eq!(changes.get(), 1);
///
/// object.remove_global_callback(&callback);
/// label.set(&object, "bye".into());
/// assert_eq!(changes.get(), 1);
/// ```
#[derive(Clone)]
pub struct CallbackObject {
    handle: Rc<ObjectHandle>,
}

/// The shared part of a [`CallbackObject`]; dropping it releases the object's
/// state.
struct ObjectHandle {
    table: PropertyTable,
    id: ObjectId,
}

impl Drop for ObjectHandle {
    fn drop(&mut self) {
        self.table.release_object(self.id);
    }
}

/// A handle to a [`CallbackObject`] that does not keep it alive.
#[derive(Clone)]
pub(crate) struct WeakCallbackObject {
    handle: Weak<ObjectHandle>,
}

impl WeakCallbackObject {
    pub(crate) fn upgrade(&self) -> Option<CallbackObject> {
        self.handle.upgrade().map(|handle| CallbackObject { handle })
    }
}

impl CallbackObject {
    pub(crate) fn from_parts(table: PropertyTable, id: ObjectId) -> Self {
        Self {
            handle: Rc::new(ObjectHandle { table, id }),
        }
    }

    /// Returns the ID of this object within its table.
    #[must_use]
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.handle.id
    }

    /// Returns the table holding this object's property state.
    #[must_use]
    #[inline]
    pub fn table(&self) -> &PropertyTable {
        &self.handle.table
    }

    /// Returns how many times `callback` is registered as a global callback.
    #[must_use]
    pub fn global_callback_count(&self, callback: &GlobalCallback) -> usize {
        self.table().global_callback_count(self.id(), callback)
    }

    pub(crate) fn downgrade(&self) -> WeakCallbackObject {
        WeakCallbackObject {
            handle: Rc::downgrade(&self.handle),
        }
    }
}

impl HasGlobalCallbacks for CallbackObject {
    fn add_global_callback(&self, callback: GlobalCallback) {
        self.table().add_global_callback(self.id(), callback);
    }

    fn remove_global_callback(&self, callback: &GlobalCallback) {
        self.table().remove_global_callback(self.id(), callback);
    }
}

impl MaybeObservable for CallbackObject {
    fn as_observable(&self) -> Option<&dyn HasGlobalCallbacks> {
        Some(self)
    }
}

/// Objects compare by identity.
impl PartialEq for CallbackObject {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.handle, &other.handle)
    }
}

impl Eq for CallbackObject {}

impl fmt::Debug for CallbackObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackObject")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for WeakCallbackObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCallbackObject")
            .field("alive", &(self.handle.strong_count() > 0))
            .finish()
    }
}
