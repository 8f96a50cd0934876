//! Deduplication cost
//!
//! Every source run is compared with every target run, so the cost grows
//! with the product of both lengths.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use trajex_core::{RootGroup, Trajectory, TrajectoryConfig};
use trajex_leaf::Value;
use trajex_merge::{MergeEngine, MergeOptions};

/// Trajectory exploring `x` over `offset..offset + runs`, plus fixed parameters
fn create_trajectory(name: &str, runs: i64, offset: i64) -> Trajectory {
    let mut traj = Trajectory::new(TrajectoryConfig::new().with_name(name))
        .expect("valid configuration");
    traj.parameters()
        .add_leaf("x", Some(Value::Int(0)))
        .expect("fresh name");
    for i in 0..4 {
        traj.parameters()
            .add_leaf(&format!("fixed.p{i}"), Some(Value::Float(0.5)))
            .expect("fresh name");
    }
    let values: Vec<Value> = (offset..offset + runs).map(Value::Int).collect();
    traj.explore([("x", values)]).expect("explorable");
    traj
}

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup");
    let engine = MergeEngine::new(MergeOptions::default().with_remove_duplicates(true));

    for runs in [10_i64, 100, 400] {
        let target = create_trajectory("a", runs, 0);
        // Half the source overlaps the target
        let source = create_trajectory("b", runs, runs / 2);
        group.throughput(Throughput::Elements(u64::try_from(runs * runs).unwrap_or(u64::MAX)));
        group.bench_with_input(BenchmarkId::new("plan", runs), &runs, |b, _| {
            b.iter(|| engine.plan(black_box(&target), black_box(&source)));
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    for (name, dedup) in [("append", false), ("dedup", true)] {
        let engine = MergeEngine::new(MergeOptions::default().with_remove_duplicates(dedup));
        let target = create_trajectory("a", 200, 0);
        let source = create_trajectory("b", 200, 100);
        group.bench_function(name, |b| {
            b.iter_batched(
                || target.full_copy(),
                |mut a| engine.merge(&mut a, black_box(&source)),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dedup, bench_merge);
criterion_main!(benches);
