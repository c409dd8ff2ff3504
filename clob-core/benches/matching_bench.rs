mod common;
use clob_core::prelude::*;
use common::*;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching for 10k orders");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("submit 10k crossing limit orders", |b| {
        b.iter_batched(
            || {
                let registry = bench_registry();
                // Resting liquidity the crossing buys will walk through.
                for i in 0..10_000u64 {
                    registry
                        .submit(make_limit_order(i, Side::Sell, 1000 + (i % 500), 10))
                        .unwrap();
                }
                registry
            },
            |registry| {
                for i in 10_000..20_000u64 {
                    let _ = registry.submit(make_limit_order(i, Side::Buy, 1500, 10));
                }
            },
            criterion::BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn stress_multi_thread_benchmark(c: &mut Criterion) {
    let registry = Arc::new(bench_registry());

    let insert_counter = Arc::new(AtomicU64::new(0));
    let cancel_counter = Arc::new(AtomicU64::new(0));

    let mut group = c.benchmark_group("stress matching");
    group.throughput(Throughput::Elements(1));
    group.bench_function("multi-thread submit/cancel TPS", |b| {
        let running = Arc::new(AtomicBool::new(true));

        let registry_insert = Arc::clone(&registry);
        let insert_counter_clone = Arc::clone(&insert_counter);
        let insert_thread_running = running.clone();
        let insert_thread = thread::spawn(move || {
            let mut i = 100_000u64;
            while insert_thread_running.load(Ordering::Relaxed) {
                i += 1;
                let mut rng = rand::rng();
                let is_limit = rng.random_bool(0.7);
                let is_buy = rng.random_bool(0.5);
                let side = if is_buy { Side::Buy } else { Side::Sell };
                if is_limit {
                    let order = make_limit_order(i, side, 1000 - (i % 500), 10);
                    let _ = registry_insert.submit(order);
                } else {
                    let order = make_market_order(i, side, 10);
                    let _ = registry_insert.submit(order);
                }
                insert_counter_clone.fetch_add(1, Ordering::Relaxed);
            }
        });

        let registry_cancel = Arc::clone(&registry);
        let cancel_counter_clone = Arc::clone(&cancel_counter);
        let cancel_thread_running = running.clone();
        let cancel_thread = thread::spawn(move || {
            let mut rng = rand::rng();
            while cancel_thread_running.load(Ordering::Relaxed) {
                let random_id = rng.random_range(0..200_000);
                let _ = registry_cancel.cancel(1, random_id);
                cancel_counter_clone.fetch_add(1, Ordering::Relaxed);
            }
        });

        b.iter(|| {
            let _ = registry.snapshot(&Pair::new("BTC/USD"));
        });

        running.store(false, Ordering::Relaxed);
        insert_thread.join().unwrap();
        cancel_thread.join().unwrap();
    });
    group.finish();
}

criterion_group!(benches, bench_matching, stress_multi_thread_benchmark);
criterion_main!(benches);
