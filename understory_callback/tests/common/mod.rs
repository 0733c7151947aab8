// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared helpers for the integration tests.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use understory_callback::{CallbackList, GlobalCallback, HasGlobalCallbacks, MaybeObservable};

/// A minimal observable value that records its global callbacks.
#[derive(Debug, Default)]
pub(crate) struct Probe {
    callbacks: RefCell<CallbackList>,
}

impl Probe {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Simulates a change of the probe's own state.
    pub(crate) fn touch(&self) {
        let callbacks = self.callbacks.borrow().snapshot();
        for callback in callbacks {
            callback.call();
        }
    }

    /// Number of times `callback` is registered on this probe.
    pub(crate) fn registrations(&self, callback: &GlobalCallback) -> usize {
        self.callbacks.borrow().count(callback)
    }

    pub(crate) fn total_registrations(&self) -> usize {
        self.callbacks.borrow().len()
    }
}

impl HasGlobalCallbacks for Probe {
    fn add_global_callback(&self, callback: GlobalCallback) {
        self.callbacks.borrow_mut().add(callback);
    }

    fn remove_global_callback(&self, callback: &GlobalCallback) {
        self.callbacks.borrow_mut().remove(callback);
    }
}

/// Probes compare by identity.
impl PartialEq for Probe {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

/// A dict value that is either plain or observable.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Item {
    Plain(i32),
    Probe(Rc<Probe>),
}

impl MaybeObservable for Item {
    fn as_observable(&self) -> Option<&dyn HasGlobalCallbacks> {
        match self {
            Self::Plain(_) => None,
            Self::Probe(probe) => Some(&**probe),
        }
    }
}

/// A callback that counts its invocations.
pub(crate) fn counter() -> (Rc<Cell<usize>>, GlobalCallback) {
    let count = Rc::new(Cell::new(0));
    let callback = {
        let count = count.clone();
        GlobalCallback::new(move || count.set(count.get() + 1))
    };
    (count, callback)
}
