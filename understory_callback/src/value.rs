// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased value storage.
//!
//! This module provides [`ErasedValue`], used for the per-instance slots of the
//! [`PropertyTable`](crate::PropertyTable) and for assigning values whose kind
//! is only known at runtime (see [`DictProperty::set`](crate::DictProperty::set)).

use alloc::rc::Rc;
use core::any::{Any, TypeId};
use core::fmt;

/// A shared, type-erased, immutable value.
///
/// Cloning an `ErasedValue` shares the contained value; use
/// [`downcast`](Self::downcast) to get an owned copy back.
///
/// # Example
///
/// ```rust
/// use understory_callback::ErasedValue;
///
/// let value = ErasedValue::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
/// assert_eq!(value.type_name(), "i32");
///
/// let shared = value.clone();
/// assert_eq!(shared.downcast::<i32>(), Some(42));
/// assert_eq!(shared.downcast::<u8>(), None);
/// ```
#[derive(Clone)]
pub struct ErasedValue {
    inner: Rc<dyn Any>,
    type_name: &'static str,
}

impl ErasedValue {
    /// Wraps a concrete value.
    #[must_use]
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            inner: Rc::new(value),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        Any::type_id(&*self.inner)
    }

    /// Returns the type name of the contained value, for diagnostics.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the contained value is of type `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        (*self.inner).is::<T>()
    }

    /// Returns a reference to the contained value if it is of type `T`.
    #[must_use]
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>()
    }

    /// Clones the contained value out as a `T`.
    ///
    /// Returns `None` if the contained value is not of type `T`.
    #[must_use]
    pub fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Returns `true` if both handles share the same value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
