//! Criterion benchmarks for bag hot paths and the handle registry.

use std::hint::black_box;
use std::num::NonZeroUsize;

use criterion::{criterion_group, criterion_main, Criterion};
use kestrel_bag::{findall, BagConfig, FindNSols, FindallContext};
use kestrel_bench::{small_solutions, wide_solutions};
use kestrel_core::{HandleKind, TargetAddr};
use kestrel_dbref::HandleRegistry;
use kestrel_test_utils::{CodecCompiler, MockDatabase, MockStack, RecordingMarker, Term};

fn bench_findall_small(c: &mut Criterion) {
    let solutions = small_solutions(1000);
    let marker = RecordingMarker::new();
    c.bench_function("findall_1k_ints", |b| {
        let mut ctx = FindallContext::new(CodecCompiler, BagConfig::default()).unwrap();
        b.iter(|| {
            let mut stack = MockStack::unbounded();
            let list = findall(
                &mut ctx,
                solutions.iter().cloned(),
                Term::Nil,
                &mut stack,
                &marker,
            )
            .unwrap();
            black_box(list);
        });
    });
}

fn bench_findall_wide(c: &mut Criterion) {
    let solutions = wide_solutions(100, 64);
    let marker = RecordingMarker::new();
    c.bench_function("findall_100_wide", |b| {
        let mut ctx = FindallContext::new(CodecCompiler, BagConfig::default()).unwrap();
        b.iter(|| {
            let mut stack = MockStack::unbounded();
            let list = findall(
                &mut ctx,
                solutions.iter().cloned(),
                Term::Nil,
                &mut stack,
                &marker,
            )
            .unwrap();
            black_box(list);
        });
    });
}

fn bench_findnsols(c: &mut Criterion) {
    let solutions = small_solutions(1000);
    let marker = RecordingMarker::new();
    let chunk = NonZeroUsize::new(50).unwrap();
    c.bench_function("findnsols_1k_by_50", |b| {
        let mut ctx = FindallContext::new(CodecCompiler, BagConfig::default()).unwrap();
        b.iter(|| {
            let mut stack = MockStack::unbounded();
            let sols = FindNSols::new(
                &mut ctx,
                chunk,
                solutions.iter().cloned(),
                Term::Nil,
                &mut stack,
                &marker,
            )
            .unwrap();
            for list in sols {
                black_box(list.unwrap());
            }
        });
    });
}

fn bench_handle_churn(c: &mut Criterion) {
    let mut db = MockDatabase::new();
    for i in 0..256 {
        db.insert(HandleKind::Clause, TargetAddr(i * 64));
    }
    c.bench_function("handle_make_release_256", |b| {
        let mut reg = HandleRegistry::new();
        b.iter(|| {
            let tokens: Vec<_> = (0..256)
                .map(|i| reg.make_handle(&mut db, HandleKind::Clause, TargetAddr(i * 64)))
                .collect();
            for token in tokens {
                reg.release(&mut db, token).unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_findall_small,
    bench_findall_wide,
    bench_findnsols,
    bench_handle_churn
);
criterion_main!(benches);
