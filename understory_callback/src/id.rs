// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifier types.
//!
//! This module provides [`PropertyId`] for descriptors, [`ObjectId`] for owner
//! instances, and [`ListenerId`] for registered property listeners.

use core::fmt;

/// A runtime property identifier.
///
/// This is a lightweight handle (u16) that uniquely identifies a property
/// within a [`PropertyRegistry`](crate::PropertyRegistry). The u16 size allows
/// up to 65,536 properties while keeping per-object slots compact.
///
/// # Example
///
/// ```rust
/// use understory_callback::PropertyId;
///
/// let id = PropertyId::new(42);
/// assert_eq!(id.index(), 42);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u16);

impl PropertyId {
    /// Creates a new property ID from the given index.
    ///
    /// This is typically called by the [`PropertyRegistry`](crate::PropertyRegistry)
    /// rather than directly.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the underlying index of this property ID.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyId").field(&self.0).finish()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyId({})", self.0)
    }
}

/// Identifies an owner instance within a [`PropertyTable`](crate::PropertyTable).
///
/// Object IDs are handed out by [`PropertyTable::create_object`](crate::PropertyTable::create_object)
/// and are never reused by the same table.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    #[inline]
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value of this ID.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectId").field(&self.0).finish()
    }
}

/// Handle for a listener added with
/// [`CallbackProperty::add_callback`](crate::CallbackProperty::add_callback) or one of
/// its siblings. Pass it back to `remove_callback` to detach the listener.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    #[inline]
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerId").field(&self.0).finish()
    }
}
