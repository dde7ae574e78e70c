mod common;

use common::{chain_config, generate_batches, run_pipeline};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use lanes::prelude::*;
use tokio::runtime::Builder;

/// Benchmark CPU-light chains across lane counts
fn bench_lane_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("lane_scaling");
    let runtime = Builder::new_multi_thread()
        .worker_threads(8)
        .enable_all()
        .build()
        .unwrap();
    let registry = Registry::with_builtins();

    let batches = 1_000;
    let per_batch = 16;
    group.throughput(Throughput::Elements((batches * per_batch) as u64));

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &threads,
            |b, &threads| {
                b.to_async(&runtime).iter_batched(
                    || {
                        let pipeline = build_pipeline(&chain_config(threads, 3), &registry).unwrap();
                        (pipeline, generate_batches(batches, per_batch))
                    },
                    |(pipeline, input)| async move {
                        black_box(run_pipeline(pipeline, input).await)
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark chains that wait, where lanes overlap the waiting
fn bench_blocking_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocking_chain");
    group.sample_size(10);
    let runtime = Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();
    let registry = Registry::with_builtins();

    for threads in [1, 4, 16] {
        let config = Config::new(
            threads,
            vec![ProcessorConfig::new("sleep").with_option("duration_ms", 1)],
        );

        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &config,
            |b, config| {
                b.to_async(&runtime).iter_batched(
                    || {
                        let pipeline = build_pipeline(config, &registry).unwrap();
                        (pipeline, generate_batches(64, 1))
                    },
                    |(pipeline, input)| async move {
                        black_box(run_pipeline(pipeline, input).await)
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_lane_scaling, bench_blocking_chain);
criterion_main!(benches);
