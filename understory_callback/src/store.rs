// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object sparse slot storage.
//!
//! Each object in a [`PropertyTable`](crate::PropertyTable) owns one
//! [`PropertyStore`]: the slots for the properties that have been touched on
//! that object (a stored value, listeners, enabled flag, delay state).
//!
//! # Implementation
//!
//! Following the `WinUI` approach, we use a sorted vector with binary search rather
//! than a hash map. This provides:
//!
//! - Better cache locality (contiguous memory)
//! - Lower memory overhead (no hash buckets)
//! - O(log n) lookup, which is fast for typical property counts (5-20)
//! - Inline storage for small property sets via `SmallVec`

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::id::{ListenerId, PropertyId};
use crate::value::ErasedValue;

/// Default inline capacity for slots.
///
/// Most objects touch fewer than 8 properties, so this avoids heap
/// allocation in the common case.
const INLINE_CAPACITY: usize = 8;

/// A listener registered for one (object, property) pair.
///
/// `func` holds an `Rc<dyn Fn(&T)>` or, when `echo_old` is set, an
/// `Rc<dyn Fn(&T, &T)>`, where `T` is the property's value type.
#[derive(Clone, Debug)]
pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) echo_old: bool,
    pub(crate) func: ErasedValue,
}

/// Nested `delay_callback` state for one slot.
#[derive(Clone, Debug)]
pub(crate) struct Delay {
    pub(crate) depth: u32,
    /// Value snapshot taken when the outermost delay started.
    pub(crate) old: ErasedValue,
}

/// Everything the table knows about one (object, property) pair.
#[derive(Clone, Debug, Default)]
pub(crate) struct Slot {
    pub(crate) value: Option<ErasedValue>,
    pub(crate) listeners: Vec<Listener>,
    pub(crate) disabled: bool,
    /// Set when a notification is dropped because the slot is disabled.
    pub(crate) suppressed: bool,
    pub(crate) delay: Option<Delay>,
}

/// Per-object sparse storage for property slots.
///
/// Uses a sorted `SmallVec` with binary search, following the `WinUI` `vector_map`
/// approach. The first 8 slots are stored inline without heap allocation.
#[derive(Clone, Debug, Default)]
pub(crate) struct PropertyStore {
    /// Slots, sorted by [`PropertyId`] for binary search lookup.
    entries: SmallVec<[(PropertyId, Slot); INLINE_CAPACITY]>,
}

impl PropertyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the number of slots.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the property IDs that have slots, in ascending order.
    pub(crate) fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Binary search for a slot by property ID.
    #[inline]
    fn find_entry(&self, id: PropertyId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |(pid, _)| *pid)
    }

    /// Returns the slot for `id`, if one exists.
    #[inline]
    pub(crate) fn slot(&self, id: PropertyId) -> Option<&Slot> {
        self.find_entry(id).ok().map(|idx| &self.entries[idx].1)
    }

    /// Returns the slot for `id`, creating an empty one if needed.
    pub(crate) fn slot_mut(&mut self, id: PropertyId) -> &mut Slot {
        let idx = match self.find_entry(id) {
            Ok(idx) => idx,
            Err(idx) => {
                self.entries.insert(idx, (id, Slot::default()));
                idx
            }
        };
        &mut self.entries[idx].1
    }

    /// Returns the stored value for `id`, if any.
    #[inline]
    pub(crate) fn value(&self, id: PropertyId) -> Option<&ErasedValue> {
        self.slot(id).and_then(|slot| slot.value.as_ref())
    }

    /// Replaces the stored value for `id`, returning the previous one.
    pub(crate) fn set_value(&mut self, id: PropertyId, value: ErasedValue) -> Option<ErasedValue> {
        self.slot_mut(id).value.replace(value)
    }
}
