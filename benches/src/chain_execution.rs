mod common;

use common::generate_batches;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use lanes::prelude::*;
use tokio::runtime::Runtime;

/// Build a chain of `depth` processors straight from the registry
fn build_executor(registry: &Registry, depth: usize) -> ChainExecutor {
    let config = Config::new(
        1,
        (0..depth).map(|_| ProcessorConfig::new("uppercase")).collect(),
    );
    build_chain(&config, registry, 0).unwrap()
}

/// Benchmark executor overhead against chain depth
fn bench_chain_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_depth");
    let runtime = Runtime::new().unwrap();
    let registry = Registry::with_builtins();

    for depth in [1, 4, 16] {
        group.throughput(Throughput::Elements(64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.to_async(&runtime).iter_batched(
                || {
                    let executor = build_executor(&registry, depth);
                    let batch = generate_batches(1, 64).remove(0);
                    (executor, batch)
                },
                |(mut executor, batch)| async move { black_box(executor.execute(batch).await) },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark the per-message error path: half the batch is rejected
fn bench_rejections(c: &mut Criterion) {
    let mut group = c.benchmark_group("rejections");
    let runtime = Runtime::new().unwrap();
    let registry = Registry::with_builtins();

    let config = Config::new(
        1,
        vec![
            ProcessorConfig::new("reject").with_option("value", "drop"),
            ProcessorConfig::new("uppercase"),
        ],
    );

    group.bench_function("half_rejected", |b| {
        b.to_async(&runtime).iter_batched(
            || {
                let executor = build_chain(&config, &registry, 0).unwrap();
                let batch = Batch::from_payloads((0..64).map(|i| if i % 2 == 0 { "drop" } else { "keep" }));
                (executor, batch)
            },
            |(mut executor, batch)| async move { black_box(executor.execute(batch).await) },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_chain_depth, bench_rejections);
criterion_main!(benches);
