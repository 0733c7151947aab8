// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Callback-propagating mapping.
//!
//! [`CallbackDict`] is a shared handle over an insertion-ordered map. Every
//! mutating operation fires the dict's callback exactly once, after the
//! mutation and the registration bookkeeping for nested observable values are
//! complete. No borrow of the entries is held while callbacks run, so a callback
//! may read or mutate the dict again.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cell::{Ref, RefCell};
use core::fmt;
use core::hash::Hash;

use hashbrown::DefaultHashBuilder;
use indexmap::IndexMap;

use crate::callback::{GlobalCallback, MaybeObservable};
use crate::error::DictError;

/// The insertion-ordered map stored inside a [`CallbackDict`].
pub type Entries<K, V> = IndexMap<K, V, DefaultHashBuilder>;

/// A mapping that calls a callback whenever it is modified.
///
/// Values that are observable (see [`MaybeObservable`]) get the dict's
/// callback registered as one of their global callbacks while they are stored,
/// so a change inside a nested value also notifies the dict's owner.
///
/// Cloning the handle shares the same mapping; use [`CallbackDict::to_vec`] to
/// copy the contents.
///
/// # Example
///
/// ```rust
/// use core::cell::Cell;
/// use std::rc::Rc;
/// use understory_callback::{CallbackDict, GlobalCallback};
///
/// let fired = Rc::new(Cell::new(0));
/// let callback = {
///     let fired = fired.clone();
///     GlobalCallback::new(move || fired.set(fired.get() + 1))
/// };
///
/// let dict = CallbackDict::new(callback, [("a", 1)]);
/// assert_eq!(fired.get(), 0);
///
/// dict.insert("b", 2);
/// assert_eq!(dict.pop(&"a"), Ok(1));
/// assert_eq!(fired.get(), 2);
/// assert_eq!(dict.to_string(), "CallbackDict with 1 elements");
/// ```
pub struct CallbackDict<K, V> {
    inner: Rc<DictInner<K, V>>,
}

struct DictInner<K, V> {
    entries: RefCell<Entries<K, V>>,
    callback: GlobalCallback,
}

/// A weak handle to a [`CallbackDict`], used by callbacks that must refer back
/// to the dict they are bound to.
pub struct WeakCallbackDict<K, V> {
    inner: Weak<DictInner<K, V>>,
}

impl<K, V> WeakCallbackDict<K, V> {
    /// Returns the dict if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<CallbackDict<K, V>> {
        self.inner.upgrade().map(|inner| CallbackDict { inner })
    }
}

impl<K, V> Clone for WeakCallbackDict<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> fmt::Debug for WeakCallbackDict<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCallbackDict")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<K, V> CallbackDict<K, V> {
    /// Returns the callback bound to this dict.
    #[must_use]
    #[inline]
    pub fn callback(&self) -> &GlobalCallback {
        &self.inner.callback
    }

    /// Returns `true` if both handles refer to the same dict.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Creates a weak handle to this dict.
    #[must_use]
    pub fn downgrade(&self) -> WeakCallbackDict<K, V> {
        WeakCallbackDict {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Returns `true` if the dict has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Borrows the entries for reading.
    ///
    /// # Panics
    ///
    /// Any mutation of this dict while the returned guard is alive panics.
    #[must_use]
    pub fn view(&self) -> Ref<'_, Entries<K, V>> {
        self.inner.entries.borrow()
    }
}

impl<K: Hash + Eq, V> CallbackDict<K, V> {
    /// Returns `true` if the dict contains `key`.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.entries.borrow().contains_key(key)
    }

    /// Returns a clone of the value stored at `key`.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.entries.borrow().get(key).cloned()
    }

    /// Returns the keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.entries.borrow().keys().cloned().collect()
    }

    /// Returns the values in insertion order.
    #[must_use]
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.inner.entries.borrow().values().cloned().collect()
    }

    /// Copies the entries out in insertion order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns `true` if both dicts hold equal entries, regardless of order.
    #[must_use]
    pub fn same_entries(&self, other: &Self) -> bool
    where
        V: PartialEq,
    {
        self.ptr_eq(other) || *self.inner.entries.borrow() == *other.inner.entries.borrow()
    }
}

impl<K, V> CallbackDict<K, V>
where
    K: Hash + Eq,
    V: MaybeObservable + Clone,
{
    /// Creates a dict bound to `callback`, holding `initial` entries.
    ///
    /// The callback is registered on every observable initial value. It is not
    /// invoked.
    #[must_use]
    pub fn new(callback: GlobalCallback, initial: impl IntoIterator<Item = (K, V)>) -> Self {
        let dict = Self {
            inner: Rc::new(DictInner {
                entries: RefCell::new(initial.into_iter().collect()),
                callback,
            }),
        };
        dict.register_initial();
        dict
    }

    /// Creates a dict whose callback is built from a weak handle to the dict
    /// itself.
    ///
    /// The weak handle cannot be upgraded until this constructor returns.
    #[must_use]
    pub fn new_cyclic<F>(initial: impl IntoIterator<Item = (K, V)>, make_callback: F) -> Self
    where
        F: FnOnce(WeakCallbackDict<K, V>) -> GlobalCallback,
    {
        let entries: Entries<K, V> = initial.into_iter().collect();
        let inner = Rc::new_cyclic(|weak| DictInner {
            entries: RefCell::new(entries),
            callback: make_callback(WeakCallbackDict {
                inner: weak.clone(),
            }),
        });
        let dict = Self { inner };
        dict.register_initial();
        dict
    }

    /// Removes every entry, deregistering the callback from observable values.
    pub fn clear(&self) {
        let observed = self.observed_values();
        for value in &observed {
            self.deregister(value);
        }
        // Dropped after the borrow ends: a value may own the last handle to an
        // object.
        let removed = core::mem::take(&mut *self.inner.entries.borrow_mut());
        drop(removed);
        self.fire("clear");
    }

    /// Removes and returns the most recently inserted entry.
    ///
    /// The popped value keeps its registration: only the returned pair is
    /// tested for observability, and a pair never is.
    pub fn pop_last(&self) -> Result<(K, V), DictError> {
        let popped = self
            .inner
            .entries
            .borrow_mut()
            .pop()
            .ok_or(DictError::EmptyContainer)?;
        self.fire("pop_last");
        Ok(popped)
    }

    /// Inserts all entries from `source`, last write wins.
    ///
    /// `source` can be another mapping or any sequence of pairs. The callback
    /// is registered on every observable value in `source`, whether or not it
    /// replaced an equal value; values that get overwritten keep their
    /// registration. Fires once, even if `source` is empty.
    pub fn merge(&self, source: impl IntoIterator<Item = (K, V)>) {
        self.merge_with(source, core::iter::empty());
    }

    /// Like [`merge`](Self::merge), then applies `extra` on top of `source`.
    pub fn merge_with(
        &self,
        source: impl IntoIterator<Item = (K, V)>,
        extra: impl IntoIterator<Item = (K, V)>,
    ) {
        // Collect first: `source` may be borrowing from this dict.
        let incoming: Vec<(K, V)> = source.into_iter().chain(extra).collect();
        let introduced: Vec<V> = incoming
            .iter()
            .filter(|(_, value)| value.as_observable().is_some())
            .map(|(_, value)| value.clone())
            .collect();
        self.inner.entries.borrow_mut().extend(incoming);
        for value in &introduced {
            self.register(value);
        }
        self.fire("merge");
    }

    /// Removes and returns the value at `key`.
    ///
    /// Fails with [`DictError::KeyNotFound`] without firing if `key` is absent.
    pub fn pop<Q>(&self, key: &Q) -> Result<V, DictError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.detach(key).ok_or(DictError::KeyNotFound)?;
        self.fire("pop");
        Ok(value)
    }

    /// Removes and returns the value at `key`, or `default` if it is absent.
    ///
    /// Fires in both cases.
    pub fn pop_or<Q>(&self, key: &Q, default: V) -> V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.detach(key).unwrap_or(default);
        self.fire("pop");
        value
    }

    /// Deletes the entry at `key`, returning its value if there was one.
    ///
    /// Fires in both cases.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.detach(key);
        self.fire("remove");
        value
    }

    /// Stores `value` at `key`, returning the previous value.
    ///
    /// The previous value is deregistered while it is still stored, and the new
    /// value is registered after it is stored, so storing the same observable
    /// again leaves it with a single registration.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let current = self.inner.entries.borrow().get(&key).cloned();
        if let Some(current) = &current {
            self.deregister(current);
        }
        let previous = self.inner.entries.borrow_mut().insert(key, value.clone());
        self.register(&value);
        self.fire("insert");
        previous
    }

    fn detach<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.inner.entries.borrow_mut().shift_remove(key)?;
        self.deregister(&value);
        Some(value)
    }

    fn observed_values(&self) -> Vec<V> {
        self.inner
            .entries
            .borrow()
            .values()
            .filter(|value| value.as_observable().is_some())
            .cloned()
            .collect()
    }

    fn register_initial(&self) {
        for value in &self.observed_values() {
            self.register(value);
        }
    }

    fn register(&self, value: &V) {
        if let Some(observable) = value.as_observable() {
            observable.add_global_callback(self.inner.callback.clone());
        }
    }

    fn deregister(&self, value: &V) {
        if let Some(observable) = value.as_observable() {
            observable.remove_global_callback(&self.inner.callback);
        }
    }

    fn fire(&self, op: &'static str) {
        tracing::trace!(op, len = self.len(), "callback dict mutated");
        self.inner.callback.call();
    }
}

impl<K, V> Clone for CallbackDict<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> fmt::Display for CallbackDict<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallbackDict with {} elements", self.len())
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CallbackDict<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("CallbackDict");
        match self.inner.entries.try_borrow() {
            Ok(entries) => s.field("entries", &*entries).finish(),
            Err(_) => s.finish_non_exhaustive(),
        }
    }
}
