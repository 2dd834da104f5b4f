//! Throughput Benchmark for GridKV
//!
//! Measures the frontier under steady-state and mid-migration workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use gridkv::commands::CommandHandler;
use gridkv::storage::{ResizePolicy, StoreFrontier, Topology};
use std::sync::Arc;
use std::time::Duration;

fn frontier(managers: usize, shards: usize, capacity: usize) -> Arc<StoreFrontier> {
    let topology = Topology::new(managers, shards).expect("non-zero topology");
    Arc::new(StoreFrontier::with_topology(
        topology,
        capacity,
        ResizePolicy::default(),
    ))
}

fn populate(store: &StoreFrontier, n: u64) {
    for i in 0..n {
        store.set(
            Bytes::from(format!("key:{}", i)),
            Bytes::from(format!("value:{}", i)),
            None,
        );
    }
}

/// A frontier halfway through moving 100k keys from 4x16 to 16x16.
fn migrating_frontier() -> Arc<StoreFrontier> {
    let store = frontier(4, 16, 200_000);
    populate(&store, 100_000);
    store
        .resize_to(Topology::new(16, 16).expect("non-zero topology"))
        .expect("store is stable");
    while store.generation_sizes().0 > 50_000 {
        store.migrate_step(1024).expect("routing table intact");
    }
    store
}

fn bench_set(c: &mut Criterion) {
    let store = frontier(16, 16, 1_000_000);

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.set(key, Bytes::from("small_value"), None);
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024));
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.set(key, value.clone(), None);
            i += 1;
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let store = frontier(16, 16, 200_000);
    populate(&store, 100_000);

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(store.get(key.as_bytes()));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(store.get(key.as_bytes()));
            i += 1;
        });
    });

    group.finish();
}

/// 80% reads, 20% writes
fn bench_mixed(c: &mut Criterion) {
    let store = frontier(16, 16, 200_000);
    populate(&store, 10_000);

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                let key = Bytes::from(format!("new:{}", i));
                store.set(key, Bytes::from("value"), None);
            } else {
                let key = format!("key:{}", i % 10_000);
                black_box(store.get(key.as_bytes()));
            }
            i += 1;
        });
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let store = frontier(4, 16, 100_000);
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            store.set(Bytes::from(key.clone()), Bytes::from("value"), None);
                            store.get(key.as_bytes());
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

fn bench_expiry(c: &mut Criterion) {
    let store = frontier(16, 16, 1_000_000);

    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.set_with_ttl(key, Bytes::from("value"), Duration::from_secs(3600));
            i += 1;
        });
    });

    group.bench_function("purge_expired", |b| {
        b.iter_batched(
            || {
                let store = frontier(4, 16, 20_000);
                for i in 0..10_000 {
                    store.set_with_ttl(
                        Bytes::from(format!("k:{}", i)),
                        Bytes::from("v"),
                        Duration::ZERO,
                    );
                }
                store
            },
            |store| black_box(store.purge_expired()),
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

/// Foreground traffic while half the keys still sit in the old generation.
fn bench_during_migration(c: &mut Criterion) {
    let mut group = c.benchmark_group("migrating");
    group.throughput(Throughput::Elements(1));

    let store = migrating_frontier();

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(store.get(key.as_bytes()));
            i += 1;
        });
    });

    group.bench_function("set_new", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("fresh:{}", i));
            store.set(key, Bytes::from("value"), None);
            i += 1;
        });
    });

    group.bench_function("migrate_all_100k", |b| {
        b.iter_batched(
            || {
                let store = frontier(4, 16, 200_000);
                populate(&store, 100_000);
                store
                    .resize_to(Topology::new(16, 16).expect("non-zero topology"))
                    .expect("store is stable");
                store
            },
            |store| black_box(store.migrate_all(1024).expect("routing table intact")),
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_commands(c: &mut Criterion) {
    let store = frontier(16, 16, 200_000);
    populate(&store, 10_000);
    let handler = CommandHandler::new(store);

    let mut group = c.benchmark_group("commands");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_line", |b| {
        b.iter(|| black_box(handler.execute("GET key:42")));
    });

    group.bench_function("set_line", |b| {
        b.iter(|| black_box(handler.execute("SET key:42 updated")));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_concurrent,
    bench_expiry,
    bench_during_migration,
    bench_commands,
);

criterion_main!(benches);
