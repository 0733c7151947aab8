// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Callback property descriptors.
//!
//! A descriptor is defined once (see [`PropertyRegistry`](crate::PropertyRegistry))
//! and shared by every object; all per-object state goes through the object's
//! [`PropertyTable`](crate::PropertyTable).
//!
//! Notification order is: listeners added with `add_callback`, then listeners
//! added with `add_callback_with_old`, then the object's global callbacks.

use alloc::rc::Rc;
use core::fmt;

use crate::error::PropertyError;
use crate::id::{ListenerId, PropertyId};
use crate::object::CallbackObject;
use crate::value::ErasedValue;

type ValueListener<T> = Rc<dyn Fn(&T)>;
type ChangeListener<T> = Rc<dyn Fn(&T, &T)>;
type Getter<T> = Rc<dyn Fn(&CallbackObject) -> T>;
type Setter<T> = Rc<dyn Fn(&CallbackObject, T)>;

/// Identity and listener plumbing shared by all descriptors.
#[derive(Copy, Clone, Debug)]
pub(crate) struct PropertyCore {
    id: PropertyId,
    name: &'static str,
}

impl PropertyCore {
    pub(crate) const fn new(id: PropertyId, name: &'static str) -> Self {
        Self { id, name }
    }

    #[inline]
    pub(crate) fn id(&self) -> PropertyId {
        self.id
    }

    #[inline]
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn notify<T: 'static>(&self, owner: &CallbackObject, old: &T, new: &T) {
        let Some(dispatch) = owner.table().dispatch(owner.id(), self.id) else {
            tracing::trace!(property = self.name, object = ?owner.id(), "notification suppressed");
            return;
        };
        tracing::trace!(
            property = self.name,
            object = ?owner.id(),
            listeners = dispatch.listeners.len(),
            global_callbacks = dispatch.global_callbacks.len(),
            "notify"
        );
        for listener in dispatch.listeners.iter().filter(|l| !l.echo_old) {
            if let Some(f) = listener.func.downcast_ref::<ValueListener<T>>() {
                f(new);
            }
        }
        for listener in dispatch.listeners.iter().filter(|l| l.echo_old) {
            if let Some(f) = listener.func.downcast_ref::<ChangeListener<T>>() {
                f(old, new);
            }
        }
        for callback in &dispatch.global_callbacks {
            callback.call();
        }
    }

    pub(crate) fn add_callback<T: 'static>(
        &self,
        owner: &CallbackObject,
        f: impl Fn(&T) + 'static,
    ) -> ListenerId {
        let f: ValueListener<T> = Rc::new(f);
        owner
            .table()
            .add_listener(owner.id(), self.id, false, ErasedValue::new(f))
    }

    pub(crate) fn add_callback_with_old<T: 'static>(
        &self,
        owner: &CallbackObject,
        f: impl Fn(&T, &T) + 'static,
    ) -> ListenerId {
        let f: ChangeListener<T> = Rc::new(f);
        owner
            .table()
            .add_listener(owner.id(), self.id, true, ErasedValue::new(f))
    }

    pub(crate) fn remove_callback(
        &self,
        owner: &CallbackObject,
        listener: ListenerId,
    ) -> Result<(), PropertyError> {
        match owner.table().remove_listener(owner.id(), self.id, listener) {
            Some(_) => Ok(()),
            None => Err(PropertyError::CallbackNotFound {
                property: self.name,
                listener,
            }),
        }
    }

    pub(crate) fn set_enabled(&self, owner: &CallbackObject, enabled: bool) {
        tracing::debug!(property = self.name, object = ?owner.id(), enabled, "toggled notifications");
        owner.table().set_disabled(owner.id(), self.id, !enabled);
    }

    pub(crate) fn is_enabled(&self, owner: &CallbackObject) -> bool {
        !owner.table().is_disabled(owner.id(), self.id)
    }
}

/// Descriptor operations used by [`delay_callback`](crate::delay_callback) and
/// [`ignore_callback`](crate::ignore_callback).
///
/// Implemented by [`CallbackProperty`] and [`DictProperty`](crate::DictProperty).
pub trait CallbackDescriptor {
    /// Returns the property ID.
    fn id(&self) -> PropertyId;

    /// Returns the property name.
    fn name(&self) -> &'static str;

    /// Captures the current value of the property on `owner`.
    fn snapshot(&self, owner: &CallbackObject) -> ErasedValue;

    /// Notifies once if the property changed since `old` was captured.
    ///
    /// `suppressed` tells whether a notification was dropped in between.
    fn notify_if_changed(&self, owner: &CallbackObject, old: &ErasedValue, suppressed: bool);
}

/// A property holding a single value, with a default shared by all objects.
///
/// Assigning a value different from the current one notifies the object's
/// listeners with the old and new values.
///
/// Reads and writes can be redirected with [`with_getter`](Self::with_getter)
/// and [`with_setter`](Self::with_setter), which makes a computed property.
/// Notification still compares what the getter returns before and after the
/// setter runs.
///
/// # Example
///
/// ```rust
/// use core::cell::RefCell;
/// use std::rc::Rc;
/// use understory_callback::{PropertyRegistry, PropertyTable};
///
/// let mut registry = PropertyRegistry::new();
/// let width = registry.callback_property("width", 0_u32);
///
/// let table = PropertyTable::new();
/// let object = table.create_object();
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let listener = {
///     let seen = seen.clone();
///     width.add_callback_with_old(&object, move |old, new| seen.borrow_mut().push((*old, *new)))
/// };
///
/// width.set(&object, 10);
/// width.set(&object, 10);
/// width.set(&object, 20);
/// assert_eq!(*seen.borrow(), [(0, 10), (10, 20)]);
///
/// width.remove_callback(&object, listener).unwrap();
/// assert!(width.remove_callback(&object, listener).is_err());
/// ```
#[derive(Clone)]
pub struct CallbackProperty<T> {
    core: PropertyCore,
    default: T,
    getter: Option<Getter<T>>,
    setter: Option<Setter<T>>,
}

impl<T: Clone + PartialEq + 'static> CallbackProperty<T> {
    pub(crate) fn new(id: PropertyId, name: &'static str, default: T) -> Self {
        Self {
            core: PropertyCore::new(id, name),
            default,
            getter: None,
            setter: None,
        }
    }

    /// Reads the value through `getter` instead of the stored value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use understory_callback::{PropertyRegistry, PropertyTable};
    ///
    /// let mut registry = PropertyRegistry::new();
    /// let celsius = registry.callback_property("celsius", 0.0_f64);
    /// let fahrenheit = {
    ///     let (get_c, set_c) = (celsius.clone(), celsius.clone());
    ///     registry
    ///         .computed_property("fahrenheit", move |o| get_c.get(o) * 9.0 / 5.0 + 32.0)
    ///         .with_setter(move |o, f| set_c.set(o, (f - 32.0) * 5.0 / 9.0))
    /// };
    ///
    /// let object = PropertyTable::new().create_object();
    /// fahrenheit.set(&object, 212.0);
    /// assert_eq!(celsius.get(&object), 100.0);
    /// assert_eq!(fahrenheit.get(&object), 212.0);
    /// ```
    #[must_use]
    pub fn with_getter(mut self, getter: impl Fn(&CallbackObject) -> T + 'static) -> Self {
        self.getter = Some(Rc::new(getter));
        self
    }

    /// Writes the value through `setter` instead of storing it.
    #[must_use]
    pub fn with_setter(mut self, setter: impl Fn(&CallbackObject, T) + 'static) -> Self {
        self.setter = Some(Rc::new(setter));
        self
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

    /// Returns the default value.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Returns the value on `owner`.
    ///
    /// Without a custom getter this is the stored value, or the default if
    /// none was set.
    #[must_use]
    pub fn get(&self, owner: &CallbackObject) -> T {
        match &self.getter {
            Some(getter) => getter(owner),
            None => self.stored(owner),
        }
    }

    /// Assigns `value` on `owner`, notifying if the value read back differs
    /// from the value read before.
    pub fn set(&self, owner: &CallbackObject, value: T) {
        let old = self.get(owner);
        match &self.setter {
            Some(setter) => setter(owner, value),
            None => self.store(owner, value),
        }
        let new = self.get(owner);
        if old != new {
            tracing::debug!(property = self.name(), object = ?owner.id(), "value changed");
            self.notify(owner, &old, &new);
        }
    }

    /// Invokes the listeners of `owner`, then its global callbacks.
    ///
    /// Does nothing while the property is disabled for `owner`.
    pub fn notify(&self, owner: &CallbackObject, old: &T, new: &T) {
        self.core.notify(owner, old, new);
    }

    /// Adds a listener called with the new value.
    pub fn add_callback(&self, owner: &CallbackObject, f: impl Fn(&T) + 'static) -> ListenerId {
        self.core.add_callback(owner, f)
    }

    /// Adds a listener called with the old and the new value.
    pub fn add_callback_with_old(
        &self,
        owner: &CallbackObject,
        f: impl Fn(&T, &T) + 'static,
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

    fn stored(&self, owner: &CallbackObject) -> T {
        let Some(value) = owner.table().value(owner.id(), self.id()) else {
            return self.default.clone();
        };
        debug_assert!(
            value.is::<T>(),
            "property '{}' found a {} in its slot; a table must only be used with one registry",
            self.name(),
            value.type_name()
        );
        value.downcast::<T>().unwrap_or_else(|| self.default.clone())
    }

    fn store(&self, owner: &CallbackObject, value: T) {
        let previous = owner
            .table()
            .set_value(owner.id(), self.id(), ErasedValue::new(value));
        drop(previous);
    }
}

impl<T: Clone + PartialEq + 'static> CallbackDescriptor for CallbackProperty<T> {
    fn id(&self) -> PropertyId {
        self.core.id()
    }

    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn snapshot(&self, owner: &CallbackObject) -> ErasedValue {
        ErasedValue::new(self.get(owner))
    }

    fn notify_if_changed(&self, owner: &CallbackObject, old: &ErasedValue, _suppressed: bool) {
        let Some(old) = old.downcast_ref::<T>() else {
            return;
        };
        let new = self.get(owner);
        if *old != new {
            self.notify(owner, old, &new);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CallbackProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackProperty")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("default", &self.default)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{GlobalCallback, HasGlobalCallbacks};
    use crate::registry::PropertyRegistry;
    use crate::table::PropertyTable;
    use alloc::format;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    fn setup() -> (CallbackProperty<i32>, CallbackObject) {
        let mut registry = PropertyRegistry::new();
        let prop = registry.callback_property("count", 0_i32);
        let table = PropertyTable::new();
        (prop, table.create_object())
    }

    #[test]
    fn get_falls_back_to_default() {
        let (prop, object) = setup();
        assert_eq!(prop.get(&object), 0);
        assert_eq!(prop.default_value(), &0);
        prop.set(&object, 5);
        assert_eq!(prop.get(&object), 5);
    }

    #[test]
    fn set_notifies_only_on_change() {
        let (prop, object) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            prop.add_callback(&object, move |new| seen.borrow_mut().push(*new));
        }
        prop.set(&object, 1);
        prop.set(&object, 1);
        prop.set(&object, 2);
        assert_eq!(*seen.borrow(), [1, 2]);
    }

    #[test]
    fn value_listeners_run_before_change_listeners_and_globals() {
        let (prop, object) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));
        {
            let order = order.clone();
            prop.add_callback_with_old(&object, move |_, _| order.borrow_mut().push("old"));
        }
        {
            let order = order.clone();
            prop.add_callback(&object, move |_| order.borrow_mut().push("new"));
        }
        {
            let order = order.clone();
            object.add_global_callback(GlobalCallback::new(move || order.borrow_mut().push("global")));
        }
        prop.set(&object, 3);
        assert_eq!(*order.borrow(), ["new", "old", "global"]);
    }

    #[test]
    fn listeners_are_per_object() {
        let (prop, object) = setup();
        let other = object.table().create_object();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            prop.add_callback(&object, move |_| hits.set(hits.get() + 1));
        }
        prop.set(&other, 9);
        assert_eq!(hits.get(), 0);
        prop.set(&object, 9);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn disable_and_enable() {
        let (prop, object) = setup();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            prop.add_callback(&object, move |_| hits.set(hits.get() + 1));
        }
        prop.disable(&object);
        assert!(!prop.is_enabled(&object));
        prop.set(&object, 1);
        assert_eq!(hits.get(), 0);
        assert_eq!(prop.get(&object), 1);

        prop.enable(&object);
        prop.set(&object, 2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn remove_unknown_callback_fails() {
        let (prop, object) = setup();
        let id = prop.add_callback(&object, |_| {});
        assert!(prop.remove_callback(&object, id).is_ok());
        assert_eq!(
            prop.remove_callback(&object, id),
            Err(PropertyError::CallbackNotFound {
                property: "count",
                listener: id,
            })
        );
    }

    #[test]
    fn listener_may_reenter_the_property() {
        let mut registry = PropertyRegistry::new();
        let prop = registry.callback_property("text", String::new());
        let object = PropertyTable::new().create_object();
        {
            let prop2 = prop.clone();
            let object2 = object.clone();
            prop.add_callback(&object, move |new: &String| {
                if !new.ends_with('!') {
                    prop2.set(&object2, format!("{new}!"));
                }
            });
        }
        prop.set(&object, String::from("hi"));
        assert_eq!(prop.get(&object), "hi!");
    }

    #[test]
    fn descriptor_snapshot_round_trip() {
        let (prop, object) = setup();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            prop.add_callback(&object, move |_| hits.set(hits.get() + 1));
        }
        let old = prop.snapshot(&object);
        prop.notify_if_changed(&object, &old, true);
        assert_eq!(hits.get(), 0);

        prop.disable(&object);
        prop.set(&object, 4);
        prop.enable(&object);
        prop.notify_if_changed(&object, &old, false);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn custom_setter_notifies_with_values_read_back() {
        let mut registry = PropertyRegistry::new();
        let cents = registry.callback_property("cents", 0_i64);
        let dollars = {
            let (get, set) = (cents.clone(), cents.clone());
            registry
                .computed_property("dollars", move |o| get.get(o) / 100)
                .with_setter(move |o, d| set.set(o, d * 100))
        };
        let object = PropertyTable::new().create_object();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            dollars.add_callback_with_old(&object, move |old, new| seen.borrow_mut().push((*old, *new)));
        }

        dollars.set(&object, 3);
        assert_eq!(cents.get(&object), 300);
        dollars.set(&object, 3);
        cents.set(&object, 450);
        dollars.set(&object, 5);
        assert_eq!(*seen.borrow(), [(0, 3), (4, 5)]);
    }

    #[test]
    fn getter_only_property_stores_but_reads_through_getter() {
        let mut registry = PropertyRegistry::new();
        let constant = registry
            .callback_property("constant", 0_i32)
            .with_getter(|_| 7);
        let object = PropertyTable::new().create_object();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            constant.add_callback(&object, move |_| hits.set(hits.get() + 1));
        }
        constant.set(&object, 1);
        assert_eq!(constant.get(&object), 7);
        assert_eq!(hits.get(), 0);
        assert_eq!(object.table().touched_properties(object.id()), [constant.id()]);
    }

    #[test]
    fn computed_property_can_be_delayed() {
        let mut registry = PropertyRegistry::new();
        let base = registry.callback_property("base", 1_i32);
        let double = {
            let (get, set) = (base.clone(), base.clone());
            registry
                .computed_property("double", move |o| get.get(o) * 2)
                .with_setter(move |o, v| set.set(o, v / 2))
        };
        let object = PropertyTable::new().create_object();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            double.add_callback(&object, move |_| hits.set(hits.get() + 1));
        }
        {
            let _delay = crate::delay::delay_callback(&object, &[&double]);
            double.set(&object, 10);
            double.set(&object, 12);
        }
        assert_eq!(hits.get(), 1);
        assert_eq!(double.get(&object), 12);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "only be used with one registry")]
    fn foreign_slot_value_is_detected() {
        let mut first = PropertyRegistry::new();
        let mut second = PropertyRegistry::new();
        let count = first.callback_property("count", 0_i32);
        let label = second.callback_property("label", String::new());
        let object = PropertyTable::new().create_object();
        count.set(&object, 1);
        let _ = label.get(&object);
    }

    #[test]
    fn debug_output() {
        let (prop, _) = setup();
        let debug = format!("{:?}", prop);
        assert!(debug.contains("CallbackProperty"));
        assert!(debug.contains("count"));
        assert!(debug.contains("getter: false"));
    }
}
