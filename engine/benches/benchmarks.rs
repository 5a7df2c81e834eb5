//! Performance benchmarks for quizsync-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quizsync_engine::{
    AggregateStats, AnswerError, ExamInfo, LocalStore, MemoryBackend, PendingSyncItem,
    TestRecord, TestResult,
};

fn exam() -> ExamInfo {
    ExamInfo::new("bench", "Bench Exam", 24, 18)
}

fn result(seed: u64) -> TestResult {
    let errors = (0..6)
        .map(|i| AnswerError::wrong(format!("q{}", (seed * 7 + i) % 400), "Question", "A", "B"))
        .collect();
    TestResult::grade(&exam(), seed, 24, 18, errors).unwrap()
}

fn populated_stats(tests: u64) -> AggregateStats {
    let mut stats = AggregateStats::new();
    for seed in 0..tests {
        stats.apply(&result(seed), seed);
    }
    stats
}

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold");

    group.bench_function("apply_fresh", |b| {
        let r = result(1);
        b.iter(|| {
            let mut stats = AggregateStats::new();
            stats.apply(black_box(&r), black_box(1));
            stats
        })
    });

    for size in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("apply_into", size), &size, |b, &size| {
            let mut stats = populated_stats(size);
            let r = result(size + 1);
            b.iter(|| stats.apply(black_box(&r), black_box(size)))
        });
    }

    group.finish();
}

fn bench_top_errors(c: &mut Criterion) {
    let mut group = c.benchmark_group("top_errors");

    for size in [10u64, 100, 1000] {
        let stats = populated_stats(size);
        group.bench_with_input(BenchmarkId::new("top_5", size), &stats, |b, stats| {
            b.iter(|| stats.top_errors(black_box(5)))
        });
    }

    group.finish();
}

fn bench_local_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_store");

    group.bench_function("save_test_full_history", |b| {
        let mut store = LocalStore::new(MemoryBackend::new(), "bench");
        for seed in 0..20 {
            store
                .save_test(&TestRecord::new(result(seed), "u1", &exam()))
                .unwrap();
        }
        let record = TestRecord::new(result(99), "u1", &exam());
        b.iter(|| store.save_test(black_box(&record)))
    });

    group.bench_function("enqueue_100", |b| {
        b.iter(|| {
            let mut store = LocalStore::new(MemoryBackend::new(), "bench");
            for seed in 0..100 {
                let record = TestRecord::new(result(seed), "u1", &exam());
                store.enqueue(PendingSyncItem::test_result(record, seed));
            }
            store.pending_count()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_fold, bench_top_errors, bench_local_store);
criterion_main!(benches);
