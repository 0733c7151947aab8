// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property registry.
//!
//! This module provides [`PropertyRegistry`], which hands out descriptors with
//! unique [`PropertyId`]s and records what was registered under each name.

use alloc::vec::Vec;
use core::hash::Hash;
use hashbrown::HashMap;

use crate::callback::MaybeObservable;
use crate::dict_property::DictProperty;
use crate::id::PropertyId;
use crate::object::CallbackObject;
use crate::property::CallbackProperty;

/// The kind of descriptor behind a registration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// A [`CallbackProperty`] holding a single value.
    Callback,
    /// A [`CallbackProperty`] read through a custom getter.
    Computed,
    /// A [`DictProperty`] holding a [`CallbackDict`](crate::CallbackDict).
    Dict,
}

/// A registration entry for a property.
#[derive(Clone, Debug)]
pub struct PropertyRegistration {
    name: &'static str,
    type_name: &'static str,
    kind: PropertyKind,
}

impl PropertyRegistration {
    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the name of the value type the property stores.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the kind of descriptor.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }
}

/// A registry for callback properties.
///
/// Properties are registered once at startup; the returned descriptors are
/// cheap to clone and are shared by every object.
///
/// # Example
///
/// ```rust
/// use understory_callback::{PropertyKind, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::new();
/// let width = registry.callback_property("width", 0.0_f64);
/// let items = registry.dict_property::<String, i32>("items");
///
/// assert_eq!(registry.name(width.id()), Some("width"));
/// assert_eq!(registry.by_name("items"), Some(items.id()));
/// assert_eq!(registry.get(items.id()).unwrap().kind(), PropertyKind::Dict);
/// ```
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    properties: Vec<PropertyRegistration>,
    by_name: HashMap<&'static str, PropertyId>,
}

impl PropertyRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single-valued property with the given default.
    ///
    /// # Panics
    ///
    /// Panics if a property with the same name is already registered,
    /// or if more than 65,535 properties are registered.
    pub fn callback_property<T: Clone + PartialEq + 'static>(
        &mut self,
        name: &'static str,
        default: T,
    ) -> CallbackProperty<T> {
        let id = self.allocate(name, core::any::type_name::<T>(), PropertyKind::Callback);
        CallbackProperty::new(id, name, default)
    }

    /// Registers a property whose value is computed by `getter`.
    ///
    /// Without a setter (see [`CallbackProperty::with_setter`]) assignments are
    /// stored but never read back. The default value is `T::default()`.
    ///
    /// # Panics
    ///
    /// Panics if a property with the same name is already registered,
    /// or if more than 65,535 properties are registered.
    pub fn computed_property<T: Clone + PartialEq + Default + 'static>(
        &mut self,
        name: &'static str,
        getter: impl Fn(&CallbackObject) -> T + 'static,
    ) -> CallbackProperty<T> {
        let id = self.allocate(name, core::any::type_name::<T>(), PropertyKind::Computed);
        CallbackProperty::new(id, name, T::default()).with_getter(getter)
    }

    /// Registers a dict property; each object starts with an empty dict.
    ///
    /// # Panics
    ///
    /// Panics if a property with the same name is already registered,
    /// or if more than 65,535 properties are registered.
    pub fn dict_property<K, V>(&mut self, name: &'static str) -> DictProperty<K, V>
    where
        K: Hash + Eq + Clone + 'static,
        V: MaybeObservable + Clone + PartialEq + 'static,
    {
        let id = self.allocate(
            name,
            core::any::type_name::<crate::CallbackDict<K, V>>(),
            PropertyKind::Dict,
        );
        DictProperty::new(id, name)
    }

    fn allocate(&mut self, name: &'static str, type_name: &'static str, kind: PropertyKind) -> PropertyId {
        assert!(
            !self.by_name.contains_key(name),
            "Property '{name}' is already registered"
        );
        assert!(
            self.properties.len() < u16::MAX as usize,
            "Too many properties registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let id = PropertyId::new(self.properties.len() as u16);

        self.properties.push(PropertyRegistration {
            name,
            type_name,
            kind,
        });
        self.by_name.insert(name, id);
        tracing::debug!(property = name, ?id, ?kind, "registered property");
        id
    }

    /// Returns the number of registered properties.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if no properties are registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<PropertyId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name of a property.
    #[must_use]
    pub fn name(&self, id: PropertyId) -> Option<&'static str> {
        self.properties.get(id.index() as usize).map(|r| r.name)
    }

    /// Returns the registration for a property.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&PropertyRegistration> {
        self.properties.get(id.index() as usize)
    }

    /// Returns an iterator over all registered properties.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyRegistration)> {
        self.properties.iter().enumerate().map(|(i, r)| {
            #[expect(clippy::cast_possible_truncation, reason = "index < len < u16::MAX")]
            (PropertyId::new(i as u16), r)
        })
    }
}
