//! Criterion micro-benchmarks for the tick barrier.

use criterion::{criterion_group, criterion_main, Criterion};

use cadence_bench::{dense_profile, ping_profile};

/// Every process runs every barrier: measures the run-phase hot path.
fn bench_dense_barrier(c: &mut Criterion) {
    let mut sim = dense_profile(4, 256, 1);
    c.bench_function("step_dense_4x256", |b| {
        b.iter(|| {
            sim.run_steps(1).unwrap();
            std::hint::black_box(sim.current_tick());
        });
    });
    sim.stop().unwrap();
}

/// Wakeups are 512 ticks apart: measures the fast-skip/leap path.
fn bench_sparse_leap(c: &mut Criterion) {
    let mut sim = dense_profile(4, 256, 512);
    c.bench_function("step_sparse_4x256", |b| {
        b.iter(|| {
            sim.run_steps(1).unwrap();
            std::hint::black_box(sim.current_tick());
        });
    });
    sim.stop().unwrap();
}

/// Single runner: isolates barrier overhead from parallel fan-out.
fn bench_single_runner(c: &mut Criterion) {
    let mut sim = dense_profile(1, 1024, 1);
    c.bench_function("step_dense_1x1024", |b| {
        b.iter(|| {
            sim.run_steps(1).unwrap();
            std::hint::black_box(sim.current_tick());
        });
    });
    sim.stop().unwrap();
}

/// Cross-runner messaging: transpose plus delivery every barrier.
fn bench_message_ping(c: &mut Criterion) {
    let mut sim = ping_profile(128);
    c.bench_function("step_ping_128_pairs", |b| {
        b.iter(|| {
            sim.run_steps(1).unwrap();
            std::hint::black_box(sim.last_metrics().messages_delivered);
        });
    });
    sim.stop().unwrap();
}

criterion_group!(
    benches,
    bench_dense_barrier,
    bench_sparse_leap,
    bench_single_runner,
    bench_message_ping
);
criterion_main!(benches);
