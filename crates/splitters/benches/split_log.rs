//! Benchmarks for log splitting
//!
//! Run with: cargo bench --package splitters

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use data_loader::{Interaction, InteractionLog};
use splitters::LogSplitter;

/// 100k interactions over 1k users and 5k items, one per second
fn synthetic_log() -> InteractionLog {
    (0..100_000u32)
        .map(|i| Interaction::new(i % 1_000, (i * 7) % 5_000, 1.0, i as i64))
        .collect()
}

fn bench_split_by_date(c: &mut Criterion) {
    let log = synthetic_log();
    let splitter = LogSplitter::new();

    c.bench_function("split_by_date", |b| {
        b.iter(|| {
            let split = splitter.split_by_date(black_box(&log), black_box(80_000));
            black_box(split)
        })
    });
}

fn bench_split_randomly(c: &mut Criterion) {
    let log = synthetic_log();
    let splitter = LogSplitter::new();

    c.bench_function("split_randomly", |b| {
        b.iter(|| {
            let split = splitter.split_randomly(black_box(&log), black_box(0.2), 1234);
            black_box(split)
        })
    });
}

criterion_group!(benches, bench_split_by_date, bench_split_randomly);
criterion_main!(benches);
