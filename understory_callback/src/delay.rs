// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped suppression of notifications.

use alloc::vec::Vec;
use core::fmt;

use crate::object::CallbackObject;
use crate::property::CallbackDescriptor;

/// Guard returned by [`delay_callback`].
///
/// While alive, the listed properties do not notify. When the outermost guard
/// for a property is dropped, the property notifies once if it changed.
#[must_use = "notifications resume as soon as the guard is dropped"]
pub struct DelayedCallbacks<'a> {
    owner: CallbackObject,
    properties: Vec<&'a dyn CallbackDescriptor>,
}

/// Delays notifications of `properties` on `owner` until the guard is dropped.
///
/// Guards nest: only the outermost one for a property notifies, comparing the
/// value at that point with the value captured when it was created. Dict
/// properties also notify if a mutation was suppressed in between.
///
/// # Example
///
/// ```rust
/// use core::cell::Cell;
/// use std::rc::Rc;
/// use understory_callback::{delay_callback, PropertyRegistry, PropertyTable};
///
/// let mut registry = PropertyRegistry::new();
/// let x = registry.callback_property("x", 0_i32);
/// let object = PropertyTable::new().create_object();
///
/// let hits = Rc::new(Cell::new(0));
/// {
///     let hits = hits.clone();
///     x.add_callback(&object, move |_| hits.set(hits.get() + 1));
/// }
///
/// {
///     let _delay = delay_callback(&object, &[&x]);
///     x.set(&object, 1);
///     x.set(&object, 2);
///     assert_eq!(hits.get(), 0);
/// }
/// assert_eq!(hits.get(), 1);
/// ```
pub fn delay_callback<'a>(
    owner: &CallbackObject,
    properties: &[&'a dyn CallbackDescriptor],
) -> DelayedCallbacks<'a> {
    for property in properties {
        let old = property.snapshot(owner);
        owner.table().delay_enter(owner.id(), property.id(), old);
    }
    DelayedCallbacks {
        owner: owner.clone(),
        properties: properties.to_vec(),
    }
}

impl Drop for DelayedCallbacks<'_> {
    fn drop(&mut self) {
        for property in &self.properties {
            let Some(end) = self.owner.table().delay_exit(self.owner.id(), property.id()) else {
                continue;
            };
            tracing::debug!(
                property = property.name(),
                object = ?self.owner.id(),
                suppressed = end.suppressed,
                "delay ended"
            );
            property.notify_if_changed(&self.owner, &end.old, end.suppressed);
        }
    }
}

impl fmt::Debug for DelayedCallbacks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedCallbacks")
            .field("owner", &self.owner.id())
            .field(
                "properties",
                &self.properties.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Guard returned by [`ignore_callback`].
#[must_use = "notifications resume as soon as the guard is dropped"]
pub struct IgnoredCallbacks<'a> {
    owner: CallbackObject,
    /// Each property with whether it was disabled before the guard.
    properties: Vec<(&'a dyn CallbackDescriptor, bool)>,
}

/// Drops all notifications of `properties` on `owner` until the guard is
/// dropped.
///
/// Nothing is notified when the guard ends; each property gets back the
/// enabled state it had before.
pub fn ignore_callback<'a>(
    owner: &CallbackObject,
    properties: &[&'a dyn CallbackDescriptor],
) -> IgnoredCallbacks<'a> {
    let table = owner.table();
    let properties = properties
        .iter()
        .map(|&property| {
            let was_disabled = table.is_disabled(owner.id(), property.id());
            table.set_disabled(owner.id(), property.id(), true);
            (property, was_disabled)
        })
        .collect();
    IgnoredCallbacks {
        owner: owner.clone(),
        properties,
    }
}

impl Drop for IgnoredCallbacks<'_> {
    fn drop(&mut self) {
        // Restore in reverse so a property listed twice ends up as it started.
        for (property, was_disabled) in self.properties.iter().rev() {
            self.owner
                .table()
                .set_disabled(self.owner.id(), property.id(), *was_disabled);
        }
    }
}

impl fmt::Debug for IgnoredCallbacks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoredCallbacks")
            .field("owner", &self.owner.id())
            .field(
                "properties",
                &self.properties.iter().map(|(p, _)| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
