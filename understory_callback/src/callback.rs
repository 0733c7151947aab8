// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Global callbacks and the observable capability.
//!
//! A *global callback* is a zero-argument function registered on an observable
//! value and invoked whenever that value's state changes. Values advertise the
//! capability through [`MaybeObservable::as_observable`]; containers such as
//! [`CallbackDict`](crate::CallbackDict) only ever dispatch on that test, never
//! on a concrete type.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use smallvec::SmallVec;

use crate::value::ErasedValue;

/// A zero-argument notification function with identity semantics.
///
/// Cloning a `GlobalCallback` yields a handle to the same function, and two
/// handles compare equal only if they point to the same function. This is what
/// lets [`HasGlobalCallbacks::remove_global_callback`] find a registration.
///
/// # Example
///
/// ```rust
/// use core::cell::Cell;
/// use std::rc::Rc;
/// use understory_callback::GlobalCallback;
///
/// let hits = Rc::new(Cell::new(0));
/// let callback = {
///     let hits = hits.clone();
///     GlobalCallback::new(move || hits.set(hits.get() + 1))
/// };
///
/// let same = callback.clone();
/// same.call();
/// assert_eq!(hits.get(), 1);
/// assert_eq!(callback, same);
/// assert_ne!(callback, GlobalCallback::new(|| {}));
/// ```
#[derive(Clone)]
pub struct GlobalCallback(Rc<dyn Fn()>);

impl GlobalCallback {
    /// Wraps a function as a global callback.
    #[must_use]
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the callback.
    #[inline]
    pub fn call(&self) {
        (self.0)();
    }

    /// Returns `true` if both handles refer to the same function.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        // Compare data pointers only; vtable addresses are not unique.
        core::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl PartialEq for GlobalCallback {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for GlobalCallback {}

impl fmt::Debug for GlobalCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalCallback")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// The observable capability: a value that accepts global callbacks.
///
/// Implementations use interior mutability since observable values are shared
/// handles. Removing a callback that is not registered must be a no-op.
pub trait HasGlobalCallbacks {
    /// Registers `callback` to be invoked on every state change.
    fn add_global_callback(&self, callback: GlobalCallback);

    /// Removes one registration of `callback`, if any.
    fn remove_global_callback(&self, callback: &GlobalCallback);
}

/// Capability test for values stored in a [`CallbackDict`](crate::CallbackDict).
///
/// Plain values keep the default implementation and return `None`.
///
/// ```rust
/// use understory_callback::MaybeObservable;
///
/// struct Plain(u8);
/// impl MaybeObservable for Plain {}
///
/// assert!(Plain(1).as_observable().is_none());
/// assert!(3_i32.as_observable().is_none());
/// ```
pub trait MaybeObservable {
    /// Returns the observable view of this value, if it has one.
    fn as_observable(&self) -> Option<&dyn HasGlobalCallbacks> {
        None
    }
}

impl<T: HasGlobalCallbacks + 'static> MaybeObservable for Rc<T> {
    fn as_observable(&self) -> Option<&dyn HasGlobalCallbacks> {
        Some(&**self)
    }
}

impl MaybeObservable for Rc<dyn HasGlobalCallbacks> {
    fn as_observable(&self) -> Option<&dyn HasGlobalCallbacks> {
        Some(&**self)
    }
}

impl<T: MaybeObservable> MaybeObservable for Option<T> {
    fn as_observable(&self) -> Option<&dyn HasGlobalCallbacks> {
        self.as_ref().and_then(MaybeObservable::as_observable)
    }
}

impl<T> MaybeObservable for Vec<T> {}

macro_rules! plain_values {
    ($($ty:ty),* $(,)?) => {
        $(impl MaybeObservable for $ty {})*
    };
}

plain_values!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
    ErasedValue,
);

/// An ordered list of global callback registrations.
///
/// Registrations are counted: adding the same callback twice requires two
/// removals. This is the building block for implementing
/// [`HasGlobalCallbacks`] on your own types.
///
/// ```rust
/// use understory_callback::{CallbackList, GlobalCallback};
///
/// let mut list = CallbackList::new();
/// let cb = GlobalCallback::new(|| {});
/// list.add(cb.clone());
/// list.add(cb.clone());
/// assert_eq!(list.count(&cb), 2);
///
/// assert!(list.remove(&cb).is_some());
/// assert_eq!(list.count(&cb), 1);
/// ```
#[derive(Clone, Default)]
pub struct CallbackList {
    callbacks: SmallVec<[GlobalCallback; 2]>,
}

impl CallbackList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a registration.
    pub fn add(&mut self, callback: GlobalCallback) {
        self.callbacks.push(callback);
    }

    /// Removes the first registration of `callback` and returns it.
    ///
    /// Returns `None` (and does nothing) if it was not registered.
    pub fn remove(&mut self, callback: &GlobalCallback) -> Option<GlobalCallback> {
        let idx = self.callbacks.iter().position(|cb| cb.ptr_eq(callback))?;
        Some(self.callbacks.remove(idx))
    }

    /// Returns how many times `callback` is registered.
    #[must_use]
    pub fn count(&self, callback: &GlobalCallback) -> usize {
        self.callbacks.iter().filter(|cb| cb.ptr_eq(callback)).count()
    }

    /// Returns the total number of registrations.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Copies the current registrations, in registration order.
    ///
    /// Callers holding the list behind a `RefCell` should take a snapshot and
    /// release the borrow before invoking, since callbacks may re-enter.
    #[must_use]
    pub fn snapshot(&self) -> Vec<GlobalCallback> {
        self.callbacks.to_vec()
    }
}

impl fmt::Debug for CallbackList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackList")
            .field("len", &self.callbacks.len())
            .finish()
    }
}
