// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for `CallbackDict`.
//!
//! Random operation sequences are replayed against the dict and against an
//! `Entries` model, checking after every step that the callback fired exactly
//! once, that the contents agree, and that each probe carries the expected
//! number of registrations.

mod common;

use std::rc::Rc;

use common::{Item, Probe, counter};
use proptest::prelude::*;
use understory_callback::{CallbackDict, Entries, MaybeObservable};

const PROBES: usize = 3;

#[derive(Clone, Debug)]
enum Value {
    Plain(i32),
    Probe(usize),
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u8, Value),
    Remove(u8),
    Pop(u8),
    PopOr(u8),
    PopLast,
    Clear,
    Merge(Vec<(u8, Value)>),
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-5_i32..5).prop_map(Value::Plain),
        (0..PROBES).prop_map(Value::Probe),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    let key = 0_u8..6;
    prop_oneof![
        4 => (key.clone(), value()).prop_map(|(k, v)| Op::Insert(k, v)),
        1 => key.clone().prop_map(Op::Remove),
        1 => key.clone().prop_map(Op::Pop),
        1 => key.clone().prop_map(Op::PopOr),
        1 => Just(Op::PopLast),
        1 => Just(Op::Clear),
        1 => proptest::collection::vec((key, value()), 0..4).prop_map(Op::Merge),
    ]
}

fn item(probes: &[Rc<Probe>], value: &Value) -> Item {
    match value {
        Value::Plain(n) => Item::Plain(*n),
        Value::Probe(i) => Item::Probe(probes[*i].clone()),
    }
}

fn probe_index(probes: &[Rc<Probe>], item: &Item) -> Option<usize> {
    match item {
        Item::Plain(_) => None,
        Item::Probe(p) => probes.iter().position(|q| Rc::ptr_eq(p, q)),
    }
}

fn release(probes: &[Rc<Probe>], old: Option<&Item>, registrations: &mut [usize; PROBES]) {
    if let Some(i) = old.and_then(|old| probe_index(probes, old)) {
        registrations[i] = registrations[i].saturating_sub(1);
    }
}

proptest! {
    #[test]
    fn every_operation_fires_exactly_once(ops in proptest::collection::vec(op(), 1..40)) {
        let probes: Vec<_> = (0..PROBES).map(|_| Probe::new()).collect();
        let (fired, callback) = counter();
        let dict: CallbackDict<u8, Item> = CallbackDict::new(callback, []);

        let mut expected = 0;
        for op in &ops {
            let should_fire = match op {
                Op::Insert(k, v) => {
                    dict.insert(*k, item(&probes, v));
                    true
                }
                Op::Remove(k) => {
                    dict.remove(k);
                    true
                }
                Op::Pop(k) => dict.pop(k).is_ok(),
                Op::PopOr(k) => {
                    dict.pop_or(k, Item::Plain(0));
                    true
                }
                Op::PopLast => dict.pop_last().is_ok(),
                Op::Clear => {
                    dict.clear();
                    true
                }
                Op::Merge(pairs) => {
                    dict.merge(pairs.iter().map(|(k, v)| (*k, item(&probes, v))));
                    true
                }
            };
            if should_fire {
                expected += 1;
            }
            prop_assert_eq!(fired.get(), expected, "after {:?}", op);
        }
    }

    #[test]
    fn contents_and_registrations_follow_the_model(ops in proptest::collection::vec(op(), 1..40)) {
        let probes: Vec<_> = (0..PROBES).map(|_| Probe::new()).collect();
        let (_, callback) = counter();
        let dict: CallbackDict<u8, Item> = CallbackDict::new(callback.clone(), []);

        let mut model: Entries<u8, Item> = Entries::default();
        let mut registrations = [0_usize; PROBES];

        for op in &ops {
            match op {
                Op::Insert(k, v) => {
                    let new = item(&probes, v);
                    let old = model.insert(*k, new.clone());
                    release(&probes, old.as_ref(), &mut registrations);
                    if let Some(i) = probe_index(&probes, &new) {
                        registrations[i] += 1;
                    }
                    dict.insert(*k, new);
                }
                Op::Remove(k) | Op::Pop(k) | Op::PopOr(k) => {
                    let old = model.shift_remove(k);
                    release(&probes, old.as_ref(), &mut registrations);
                    dict.remove(k);
                }
                Op::PopLast => {
                    // The popped value keeps its registration.
                    let expected = model.pop();
                    prop_assert_eq!(dict.pop_last().ok(), expected);
                }
                Op::Clear => {
                    for old in model.values() {
                        release(&probes, Some(old), &mut registrations);
                    }
                    model.clear();
                    dict.clear();
                }
                Op::Merge(pairs) => {
                    let incoming: Vec<_> = pairs.iter().map(|(k, v)| (*k, item(&probes, v))).collect();
                    for (_, v) in &incoming {
                        if let Some(i) = probe_index(&probes, v) {
                            registrations[i] += 1;
                        }
                    }
                    model.extend(incoming.iter().cloned());
                    dict.merge(incoming);
                }
            }

            prop_assert_eq!(dict.to_vec(), model.clone().into_iter().collect::<Vec<_>>());
            for (i, probe) in probes.iter().enumerate() {
                prop_assert_eq!(probe.registrations(&callback), registrations[i], "probe {} after {:?}", i, op);
            }
        }
    }

    #[test]
    fn present_probes_are_always_registered(ops in proptest::collection::vec(op(), 1..40)) {
        let probes: Vec<_> = (0..PROBES).map(|_| Probe::new()).collect();
        let (_, callback) = counter();
        let dict: CallbackDict<u8, Item> = CallbackDict::new(callback.clone(), []);

        for op in &ops {
            match op {
                Op::Insert(k, v) => { dict.insert(*k, item(&probes, v)); }
                Op::Remove(k) => { dict.remove(k); }
                Op::Pop(k) => { let _ = dict.pop(k); }
                Op::PopOr(k) => { dict.pop_or(k, Item::Plain(0)); }
                Op::PopLast => { let _ = dict.pop_last(); }
                Op::Clear => dict.clear(),
                Op::Merge(pairs) => dict.merge(pairs.iter().map(|(k, v)| (*k, item(&probes, v)))),
            }
            for value in dict.values() {
                if value.as_observable().is_some() {
                    let i = probe_index(&probes, &value).unwrap();
                    prop_assert!(probes[i].registrations(&callback) >= 1);
                }
            }
        }
    }
}
