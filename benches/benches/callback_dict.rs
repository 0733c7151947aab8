// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_callback`.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Once;

use understory_callback::{
    CallbackDict, CallbackObject, GlobalCallback, PropertyRegistry, PropertyTable,
};

fn bench_dict(c: &mut Criterion) {
    static PRINT_SIZES: Once = Once::new();
    PRINT_SIZES.call_once(|| {
        eprintln!(
            "sizes: CallbackDict={} CallbackObject={} GlobalCallback={}",
            core::mem::size_of::<CallbackDict<u32, u32>>(),
            core::mem::size_of::<CallbackObject>(),
            core::mem::size_of::<GlobalCallback>(),
        );
    });

    let mut group = c.benchmark_group("callback_dict/mutate");

    group.bench_function("insert/plain", |b| {
        let dict = CallbackDict::new(GlobalCallback::new(|| {}), []);
        let mut key = 0_u32;
        b.iter(|| {
            key = key.wrapping_add(1) % 1024;
            black_box(dict.insert(key, key));
        });
    });

    group.bench_function("insert/object", |b| {
        let table = PropertyTable::new();
        let objects: Vec<_> = (0..64).map(|_| table.create_object()).collect();
        let dict = CallbackDict::new(GlobalCallback::new(|| {}), []);
        let mut key = 0_usize;
        b.iter(|| {
            key = (key + 1) % objects.len();
            black_box(dict.insert(key, objects[key].clone()));
        });
    });

    for len in [16_u32, 256] {
        group.bench_with_input(BenchmarkId::new("clear", len), &len, |b, &len| {
            b.iter_batched(
                || CallbackDict::new(GlobalCallback::new(|| {}), (0..len).map(|i| (i, i))),
                |dict| {
                    dict.clear();
                    black_box(dict);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_property(c: &mut Criterion) {
    let mut registry = PropertyRegistry::new();
    let width = registry.callback_property("width", 0.0_f64);
    let children = registry.dict_property::<u32, CallbackObject>("children");

    let mut group = c.benchmark_group("callback_dict/property");

    group.bench_function("set/f64/no_listener", |b| {
        let object = PropertyTable::new().create_object();
        let mut value = 0.0;
        b.iter(|| {
            value += 1.0;
            width.set(&object, black_box(value));
        });
    });

    group.bench_function("set/f64/with_listener", |b| {
        let object = PropertyTable::new().create_object();
        width.add_callback_with_old(&object, |old, new| {
            black_box((old, new));
        });
        let mut value = 0.0;
        b.iter(|| {
            value += 1.0;
            width.set(&object, black_box(value));
        });
    });

    group.bench_function("nested/propagate", |b| {
        let table = PropertyTable::new();
        let parent = table.create_object();
        let child = table.create_object();
        children.add_callback(&parent, |dict| {
            black_box(dict.len());
        });
        children.get(&parent).insert(0, child.clone());
        let mut value = 0.0;
        b.iter(|| {
            value += 1.0;
            width.set(&child, value);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_dict, bench_property);
criterion_main!(benches);
