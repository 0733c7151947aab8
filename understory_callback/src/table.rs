// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-instance property table.
//!
//! Descriptors hold no per-instance state. Everything that varies per owner
//! (stored values, listeners, enabled flags, delay state, the owner's global
//! callbacks) lives in a [`PropertyTable`], keyed by `(ObjectId, PropertyId)`.
//!
//! The table is a shared handle with interior mutability. Every method borrows
//! the table only for the duration of its own bookkeeping, so user code (which
//! always runs outside those borrows) may call back into the table.
//!
//! Slots are keyed by [`PropertyId`], which is only unique within one
//! [`PropertyRegistry`](crate::PropertyRegistry): a table must only be used
//! with descriptors from a single registry.
//!
//! An object's state lives as long as some [`CallbackObject`] handle to it.
//! Dropping the last handle removes the state, including anything it stored.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;

use crate::callback::{CallbackList, GlobalCallback};
use crate::id::{ListenerId, ObjectId, PropertyId};
use crate::object::CallbackObject;
use crate::store::{Delay, Listener, PropertyStore};
use crate::value::ErasedValue;

/// Shared storage for the callback properties of a set of objects.
///
/// # Example
///
/// ```rust
/// use understory_callback::{PropertyRegistry, PropertyTable};
///
/// let mut registry = PropertyRegistry::new();
/// let width = registry.callback_property("width", 0_u32);
///
/// let table = PropertyTable::new();
/// let a = table.create_object();
/// let b = table.create_object();
///
/// width.set(&a, 10);
/// assert_eq!(width.get(&a), 10);
/// assert_eq!(width.get(&b), 0);
/// assert_eq!(table.object_count(), 2);
/// ```
#[derive(Clone, Default)]
pub struct PropertyTable {
    state: Rc<RefCell<TableState>>,
}

#[derive(Default)]
struct TableState {
    objects: HashMap<ObjectId, ObjectState>,
    next_object: u64,
    next_listener: u64,
}

#[derive(Default)]
struct ObjectState {
    store: PropertyStore,
    global_callbacks: CallbackList,
}

impl TableState {
    fn object_mut(&mut self, object: ObjectId) -> &mut ObjectState {
        self.objects.entry(object).or_default()
    }
}

/// What a notification has to invoke, gathered under a short borrow.
#[derive(Debug)]
pub(crate) struct Dispatch {
    pub(crate) listeners: Vec<Listener>,
    pub(crate) global_callbacks: Vec<GlobalCallback>,
}

/// The state handed back when the outermost delay of a slot ends.
#[derive(Debug)]
pub(crate) struct DelayEnd {
    pub(crate) old: ErasedValue,
    pub(crate) suppressed: bool,
}

impl PropertyTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new owner instance backed by this table.
    #[must_use]
    pub fn create_object(&self) -> CallbackObject {
        let mut state = self.state.borrow_mut();
        let id = ObjectId::new(state.next_object);
        state.next_object += 1;
        state.objects.insert(id, ObjectState::default());
        drop(state);
        tracing::trace!(object = ?id, "created object");
        CallbackObject::from_parts(self.clone(), id)
    }

    /// Returns the number of live objects in this table.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.state.borrow().objects.len()
    }

    /// Returns the properties that have been touched on `object`, in ascending
    /// ID order.
    #[must_use]
    pub fn touched_properties(&self, object: ObjectId) -> Vec<PropertyId> {
        self.state
            .borrow()
            .objects
            .get(&object)
            .map(|o| o.store.property_ids().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if both handles refer to the same table.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Removes the state of an object whose last handle was dropped.
    pub(crate) fn release_object(&self, object: ObjectId) {
        // Dropped after the borrow ends: stored values may hold other objects.
        let released = self.state.borrow_mut().objects.remove(&object);
        tracing::trace!(object = ?object, stored = released.is_some(), "released object");
        drop(released);
    }

    pub(crate) fn value(&self, object: ObjectId, property: PropertyId) -> Option<ErasedValue> {
        self.state
            .borrow()
            .objects
            .get(&object)
            .and_then(|o| o.store.value(property))
            .cloned()
    }

    /// Stores `value`, returning the previous one.
    ///
    /// The previous value is returned rather than dropped so that it is never
    /// dropped while the table is borrowed.
    pub(crate) fn set_value(
        &self,
        object: ObjectId,
        property: PropertyId,
        value: ErasedValue,
    ) -> Option<ErasedValue> {
        self.state
            .borrow_mut()
            .object_mut(object)
            .store
            .set_value(property, value)
    }

    pub(crate) fn add_listener(
        &self,
        object: ObjectId,
        property: PropertyId,
        echo_old: bool,
        func: ErasedValue,
    ) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = ListenerId::new(state.next_listener);
        state.next_listener += 1;
        state
            .object_mut(object)
            .store
            .slot_mut(property)
            .listeners
            .push(Listener { id, echo_old, func });
        id
    }

    /// Removes a listener, returning it if it was registered.
    pub(crate) fn remove_listener(
        &self,
        object: ObjectId,
        property: PropertyId,
        listener: ListenerId,
    ) -> Option<Listener> {
        let mut state = self.state.borrow_mut();
        let slot = state.object_mut(object).store.slot_mut(property);
        let idx = slot.listeners.iter().position(|l| l.id == listener)?;
        Some(slot.listeners.remove(idx))
    }

    pub(crate) fn set_disabled(&self, object: ObjectId, property: PropertyId, disabled: bool) {
        self.state
            .borrow_mut()
            .object_mut(object)
            .store
            .slot_mut(property)
            .disabled = disabled;
    }

    pub(crate) fn is_disabled(&self, object: ObjectId, property: PropertyId) -> bool {
        self.state
            .borrow()
            .objects
            .get(&object)
            .and_then(|o| o.store.slot(property))
            .is_some_and(|slot| slot.disabled)
    }

    /// Collects what a notification must invoke.
    ///
    /// Returns `None`, and records the suppression, if the slot is disabled.
    pub(crate) fn dispatch(&self, object: ObjectId, property: PropertyId) -> Option<Dispatch> {
        let mut state = self.state.borrow_mut();
        let object_state = state.object_mut(object);
        let global_callbacks = object_state.global_callbacks.snapshot();
        let slot = object_state.store.slot_mut(property);
        if slot.disabled {
            slot.suppressed = true;
            return None;
        }
        Some(Dispatch {
            listeners: slot.listeners.clone(),
            global_callbacks,
        })
    }

    pub(crate) fn add_global_callback(&self, object: ObjectId, callback: GlobalCallback) {
        self.state
            .borrow_mut()
            .object_mut(object)
            .global_callbacks
            .add(callback);
    }

    pub(crate) fn remove_global_callback(&self, object: ObjectId, callback: &GlobalCallback) {
        // The removed callback may own the last handle to another object.
        let removed = self
            .state
            .borrow_mut()
            .objects
            .get_mut(&object)
            .and_then(|o| o.global_callbacks.remove(callback));
        drop(removed);
    }

    pub(crate) fn global_callback_count(&self, object: ObjectId, callback: &GlobalCallback) -> usize {
        self.state
            .borrow()
            .objects
            .get(&object)
            .map_or(0, |o| o.global_callbacks.count(callback))
    }

    /// Enters a (possibly nested) delay for a slot and disables it.
    ///
    /// `old` is kept only when this is the outermost delay.
    pub(crate) fn delay_enter(&self, object: ObjectId, property: PropertyId, old: ErasedValue) {
        let mut state = self.state.borrow_mut();
        let slot = state.object_mut(object).store.slot_mut(property);
        match &mut slot.delay {
            Some(delay) => delay.depth += 1,
            None => {
                slot.delay = Some(Delay { depth: 1, old });
                slot.suppressed = false;
            }
        }
        slot.disabled = true;
    }

    /// Leaves one level of delay for a slot.
    ///
    /// When the outermost delay ends the slot is re-enabled and the snapshot
    /// taken on entry is returned.
    pub(crate) fn delay_exit(&self, object: ObjectId, property: PropertyId) -> Option<DelayEnd> {
        let mut state = self.state.borrow_mut();
        let slot = state.object_mut(object).store.slot_mut(property);
        let delay = slot.delay.as_mut()?;
        if delay.depth > 1 {
            delay.depth -= 1;
            return None;
        }
        let delay = slot.delay.take()?;
        slot.disabled = false;
        Some(DelayEnd {
            old: delay.old,
            suppressed: core::mem::take(&mut slot.suppressed),
        })
    }
}

impl fmt::Debug for PropertyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PropertyTable");
        match self.state.try_borrow() {
            Ok(state) => s
                .field("objects", &state.objects.len())
                .field(
                    "slots",
                    &state.objects.values().map(|o| o.store.len()).sum::<usize>(),
                )
                .finish(),
            Err(_) => s.finish_non_exhaustive(),
        }
    }
}
