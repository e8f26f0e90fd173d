//! Basic benchmarks for the `slot_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]
#![allow(
    clippy::undocumented_unsafe_blocks,
    reason = "benchmark code only returns slots to the pool they came from"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use slot_pool::SlotPool;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("slot_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(SlotPool::<TestItem>::new()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_first");
    group.bench_function("allocate_first", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(SlotPool::<TestItem>::new)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.allocate(black_box(1)).unwrap());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_second");
    group.bench_function("allocate_second", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(SlotPool::<TestItem>::new)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            // Pre-warm each pool with one slot, so the block already exists.
            for pool in &mut pools {
                _ = pool.allocate(1).unwrap();
            }

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                _ = black_box(pool.allocate(black_box(1)).unwrap());
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("reuse_one");
    group.bench_function("reuse_one", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::with_capacity(1).unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let slot = black_box(pool.allocate(1).unwrap());
                unsafe { pool.deallocate(slot, 1) };
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_array");
    group.bench_function("allocate_array", |b| {
        b.iter_custom(|iters| {
            let mut pool = SlotPool::<TestItem>::new();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let array = black_box(pool.allocate(black_box(8)).unwrap());
                unsafe { pool.deallocate(array, 8) };
            }

            start.elapsed()
        });
    });

    group.finish();

    let mut group = c.benchmark_group("slot_slow");

    let allocs_op = allocs.operation("allocate_10k");
    group.bench_function("allocate_10k", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(SlotPool::<TestItem>::new)
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                for _ in 0..10_000 {
                    _ = black_box(pool.allocate(1).unwrap());
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("allocate_10k_reserved");
    group.bench_function("allocate_10k_reserved", |b| {
        b.iter_custom(|iters| {
            let mut pools = iter::repeat_with(|| SlotPool::<TestItem>::with_capacity(10_000))
                .take(usize::try_from(iters).unwrap())
                .collect::<Result<Vec<_>, _>>()
                .unwrap();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &mut pools {
                for _ in 0..10_000 {
                    _ = black_box(pool.allocate(1).unwrap());
                }
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
