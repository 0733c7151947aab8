// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Callback: reactive properties and callback-propagating dicts.
//!
//! This crate provides properties that notify listeners when they change, and
//! a mapping type, [`CallbackDict`], whose mutations (including mutations of
//! observable values stored in it) notify the object that owns it.
//!
//! ## Core Concepts
//!
//! ### Descriptors and objects
//!
//! A [`PropertyRegistry`] hands out descriptors, defined once and shared by
//! every object:
//!
//! - [`CallbackProperty`] - a single value with a default, or computed through
//!   a custom getter and setter
//! - [`DictProperty`] - a [`CallbackDict`] per object, created empty on first access
//!
//! Per-object state (values, listeners, enabled flags) lives in a
//! [`PropertyTable`]; a [`CallbackObject`] is a handle into it. The state is
//! removed when the last handle to its object is dropped.
//!
//! ### Propagation
//!
//! Anything implementing [`HasGlobalCallbacks`] can carry [`GlobalCallback`]s.
//! When such a value is stored in a [`CallbackDict`], the dict registers its
//! own callback on it, so a change of the value reaches the dict's owner.
//! [`CallbackObject`] is observable in this way: its global callbacks run
//! after any of its properties notifies.
//!
//! ## Quick Start
//!
//! ```rust
//! use core::cell::Cell;
//! use std::rc::Rc;
//! use understory_callback::{CallbackObject, PropertyRegistry, PropertyTable};
//!
//! let mut registry = PropertyRegistry::new();
//! let children = registry.dict_property::<String, CallbackObject>("children");
//! let title = registry.callback_property("title", String::new());
//!
//! let table = PropertyTable::new();
//! let parent = table.create_object();
//! let child = table.create_object();
//!
//! let changes = Rc::new(Cell::new(0));
//! {
//!     let changes = changes.clone();
//!     children.add_callback(&parent, move |_| changes.set(changes.get() + 1));
//! }
//!
//! // Mutating the dict notifies the parent.
//! children.get(&parent).insert("first".into(), child.clone());
//! assert_eq!(changes.get(), 1);
//!
//! // So does changing a child stored in it.
//! title.set(&child, "Hello".into());
//! assert_eq!(changes.get(), 2);
//!
//! // Once removed, the child no longer reaches the parent.
//! children.get(&parent).remove("first");
//! title.set(&child, "Bye".into());
//! assert_eq!(changes.get(), 3);
//! ```
//!
//! ## Re-entrancy
//!
//! No internal borrow is held while callbacks or listeners run, so they may
//! read and mutate the same dict or table. Holding a [`CallbackDict::view`]
//! borrow across a mutation of that dict panics.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod callback;
mod delay;
mod dict;
mod dict_property;
mod error;
mod id;
mod object;
mod property;
mod registry;
mod store;
mod table;
mod value;

pub use callback::{CallbackList, GlobalCallback, HasGlobalCallbacks, MaybeObservable};
pub use delay::{DelayedCallbacks, IgnoredCallbacks, delay_callback, ignore_callback};
pub use dict::{CallbackDict, Entries, WeakCallbackDict};
pub use dict_property::DictProperty;
pub use error::{DictError, PropertyError};
pub use id::{ListenerId, ObjectId, PropertyId};
pub use object::CallbackObject;
pub use property::{CallbackDescriptor, CallbackProperty};
pub use registry::{PropertyKind, PropertyRegistration, PropertyRegistry};
pub use table::PropertyTable;
pub use value::ErasedValue;
