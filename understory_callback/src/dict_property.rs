// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dict-valued properties.
//!
//! A [`DictProperty`] gives every object its own [`CallbackDict`], created
//! empty on first access. The dict's callback is bound to the owning object:
//! any mutation of the dict (or of an observable value stored in it) notifies
//! the property's listeners with the dict as both the old and the new value,
//! followed by the object's global callbacks.

use core::fmt;
use core::hash::Hash;
use core::marker::PhantomData;

use hashbrown::HashMap;

use crate::callback::{GlobalCallback, MaybeObservable};
use crate::dict::{CallbackDict, Entries};
use crate::error::PropertyError;
use crate::id::{ListenerId, PropertyId};
use crate::object::{CallbackObject, WeakCallbackObject};
use crate::property::{CallbackDescriptor, PropertyCore};
use crate::value::ErasedValue;

const EXPECTED_MAPPING: &str = "a CallbackDict, an Entries map or a HashMap of matching types";

/// A property whose per-object value is a [`CallbackDict`].
///
/// # Example
///
/// ```rust
/// use core::cell::Cell;
/// use std::rc::Rc;
/// use understory_callback::{PropertyRegistry, PropertyTable};
///
/// let mut registry = PropertyRegistry::new();
/// let scores = registry.dict_property::<&'static str, i32>("scores");
///
/// let table = PropertyTable::new();
/// let player = table.create_object();
///
/// let changes = Rc::new(Cell::new(0));
/// {
///     let changes = changes.clone();
///     scores.add_callback(&player, move |_| changes.set(changes.get() + 1));
/// }
///
/// let dict = scores.get(&player);
/// assert!(dict.is_empty());
/// assert_eq!(changes.get(), 0);
///
/// dict.insert("alice", 3);
/// scores.get(&player).insert("bob", 5);
/// assert_eq!(changes.get(), 2);
/// assert_eq!(dict.len(), 2);
/// ```
pub struct DictProperty<K, V> {
    core: PropertyCore,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> DictProperty<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: MaybeObservable + Clone + PartialEq + 'static,
{
    pub(crate) fn new(id: PropertyId, name: &'static str) -> Self {
        Self {
            core: PropertyCore::new(id, name),
            _marker: PhantomData,
        }
    }

    /// Returns the property ID.
    #[must_use]
    #[inline]
    pub fn id(&self) -> PropertyId {
        self.core.id()
    }

    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.core.name()
    }

    /// Returns the dict stored on `owner`, creating an empty one on first
    /// access.
    ///
    /// Creating the dict does not notify.
    #[must_use]
    pub fn get(&self, owner: &CallbackObject) -> CallbackDict<K, V> {
        if let Some(dict) = self.stored(owner) {
            return dict;
        }
        let dict = self.bind(owner, core::iter::empty());
        let previous = owner
            .table()
            .set_value(owner.id(), self.id(), ErasedValue::new(dict.clone()));
        drop(previous);
        tracing::debug!(property = self.name(), object = ?owner.id(), "created empty dict");
        dict
    }

    /// Assigns a dynamically typed mapping to `owner`.
    ///
    /// Accepts a [`CallbackDict<K, V>`], an [`Entries<K, V>`] or a
    /// [`hashbrown::HashMap<K, V>`]; its entries are copied into a new dict
    /// bound to `owner`, as with [`replace`](Self::replace).
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::InvalidValueKind`] for any other value. Nothing
    /// is stored in that case.
    pub fn set(
        &self,
        owner: &CallbackObject,
        value: ErasedValue,
    ) -> Result<CallbackDict<K, V>, PropertyError> {
        let entries: Entries<K, V> = if let Some(dict) = value.downcast_ref::<CallbackDict<K, V>>() {
            dict.to_vec().into_iter().collect()
        } else if let Some(entries) = value.downcast_ref::<Entries<K, V>>() {
            entries.clone()
        } else if let Some(map) = value.downcast_ref::<HashMap<K, V>>() {
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        } else {
            tracing::debug!(property = self.name(), found = value.type_name(), "rejected value");
            return Err(PropertyError::InvalidValueKind {
                property: self.name(),
                expected: EXPECTED_MAPPING,
                found: value.type_name(),
            });
        };
        Ok(self.replace(owner, entries))
    }

    /// Stores a new dict holding `entries` on `owner` and returns it.
    ///
    /// Notifies with the previous and the new dict if their contents differ.
    /// The previous dict keeps its callback registered on the values it holds.
    pub fn replace(
        &self,
        owner: &CallbackObject,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> CallbackDict<K, V> {
        let old = self.get(owner);
        let new = self.bind(owner, entries);
        let previous = owner
            .table()
            .set_value(owner.id(), self.id(), ErasedValue::new(new.clone()));
        drop(previous);
        tracing::debug!(property = self.name(), object = ?owner.id(), len = new.len(), "replaced dict");
        if !old.same_entries(&new) {
            self.notify(owner, &old, &new);
        }
        new
    }

    /// Invokes the listeners of `owner`, then its global callbacks.
    ///
    /// Does nothing while the property is disabled for `owner`.
    pub fn notify(&self, owner: &CallbackObject, old: &CallbackDict<K, V>, new: &CallbackDict<K, V>) {
        self.core.notify(owner, old, new);
    }

    /// Adds a listener called with the current dict.
    pub fn add_callback(
        &self,
        owner: &CallbackObject,
        f: impl Fn(&CallbackDict<K, V>) + 'static,
    ) -> ListenerId {
        self.core.add_callback(owner, f)
    }

    /// Adds a listener called with the old and the new dict.
    ///
    /// For in-place mutations both arguments are the same dict.
    pub fn add_callback_with_old(
        &self,
        owner: &CallbackObject,
        f: impl Fn(&CallbackDict<K, V>, &CallbackDict<K, V>) + 'static,
    ) -> ListenerId {
        self.core.add_callback_with_old(owner, f)
    }

    /// Removes a listener added on `owner`.
    ///
    /// Fails with [`PropertyError::CallbackNotFound`] if it is not registered.
    pub fn remove_callback(
        &self,
        owner: &CallbackObject,
        listener: ListenerId,
    ) -> Result<(), PropertyError> {
        self.core.remove_callback(owner, listener)
    }

    /// Stops notifications for `owner` until [`enable`](Self::enable) is called.
    ///
    /// The dict still accepts mutations while disabled.
    pub fn disable(&self, owner: &CallbackObject) {
        self.core.set_enabled(owner, false);
    }

    /// Re-enables notifications for `owner`.
    pub fn enable(&self, owner: &CallbackObject) {
        self.core.set_enabled(owner, true);
    }

    /// Returns `true` unless notifications are disabled for `owner`.
    #[must_use]
    pub fn is_enabled(&self, owner: &CallbackObject) -> bool {
        self.core.is_enabled(owner)
    }

    fn stored(&self, owner: &CallbackObject) -> Option<CallbackDict<K, V>> {
        let value = owner.table().value(owner.id(), self.id())?;
        debug_assert!(
            value.is::<CallbackDict<K, V>>(),
            "property '{}' found a {} in its slot; a table must only be used with one registry",
            self.name(),
            value.type_name()
        );
        value.downcast::<CallbackDict<K, V>>()
    }

    /// Builds a dict whose callback notifies this property on `owner`.
    ///
    /// The callback holds the owner and the dict weakly, so a dict stored on
    /// the owner keeps neither alive.
    fn bind(
        &self,
        owner: &CallbackObject,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> CallbackDict<K, V> {
        let binding = Binding {
            owner: owner.downgrade(),
            property: self.clone(),
        };
        CallbackDict::new_cyclic(entries, move |weak| {
            GlobalCallback::new(move || {
                if let Some(dict) = weak.upgrade() {
                    binding.fire(&dict);
                }
            })
        })
    }
}

struct Binding<K, V> {
    owner: WeakCallbackObject,
    property: DictProperty<K, V>,
}

impl<K, V> Binding<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: MaybeObservable + Clone + PartialEq + 'static,
{
    fn fire(&self, dict: &CallbackDict<K, V>) {
        if let Some(owner) = self.owner.upgrade() {
            self.property.notify(&owner, dict, dict);
        }
    }
}

impl<K, V> CallbackDescriptor for DictProperty<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: MaybeObservable + Clone + PartialEq + 'static,
{
    fn id(&self) -> PropertyId {
        self.core.id()
    }

    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn snapshot(&self, owner: &CallbackObject) -> ErasedValue {
        ErasedValue::new(self.get(owner))
    }

    fn notify_if_changed(&self, owner: &CallbackObject, old: &ErasedValue, suppressed: bool) {
        let Some(old) = old.downcast_ref::<CallbackDict<K, V>>() else {
            return;
        };
        let new = self.get(owner);
        if suppressed || !old.same_entries(&new) {
            self.notify(owner, old, &new);
        }
    }
}

impl<K, V> Clone for DictProperty<K, V> {
    fn clone(&self) -> Self {
        Self {
            core: self.core,
            _marker: PhantomData,
        }
    }
}

impl<K, V> fmt::Debug for DictProperty<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictProperty")
            .field("id", &self.core.id())
            .field("name", &self.core.name())
            .finish()
    }
}
