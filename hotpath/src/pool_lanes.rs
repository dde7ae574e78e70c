use lanes::prelude::*;
use tokio::runtime::Builder;
use tokio::sync::mpsc;

/// Pool hotpath profiling
///
/// Profiles a four-lane pool pushing 100K messages through a short chain.
/// Shows where time goes between the shared receiver, the executor and
/// outbound hand-off.
///
/// Run with: cargo run --release --bin hotpath_pool_lanes --features profiling
#[hotpath::main]
fn main() {
    println!("=== Pool Lanes Hotpath Profile ===");
    println!("Workload: 10K batches × 10 messages, 4 lanes");
    println!();

    let runtime = Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();

    let delivered = runtime.block_on(run_pool_workload());

    println!();
    println!("Delivered {} messages", delivered);
}

#[hotpath::measure]
async fn run_pool_workload() -> usize {
    let config = Config::new(
        4,
        vec![
            ProcessorConfig::new("uppercase"),
            ProcessorConfig::new("filter").with_option("contains", "SKIP"),
            ProcessorConfig::new("metadata")
                .with_option("key", "profiled")
                .with_option("value", "yes"),
        ],
    );

    let mut pipeline = build_pipeline(&config, &Registry::with_builtins()).unwrap();
    let (tx, rx) = mpsc::channel(64);
    let mut results = pipeline.consume(rx).unwrap();

    tokio::spawn(feed_batches(tx, 10_000, 10));

    let mut delivered = 0;
    while let Some(batch) = results.recv().await {
        delivered += acknowledge(batch);
    }

    pipeline.wait().await.unwrap();
    delivered
}

#[hotpath::measure]
async fn feed_batches(tx: mpsc::Sender<Batch>, batches: usize, per_batch: usize) {
    for b in 0..batches {
        let batch = Batch::from_payloads((0..per_batch).map(|m| {
            if m % 5 == 0 {
                format!("skip-{b}-{m}")
            } else {
                format!("message-{b}-{m}")
            }
        }));
        if tx.send(batch).await.is_err() {
            break;
        }
    }
}

#[hotpath::measure]
fn acknowledge(batch: Batch) -> usize {
    batch.ack();
    batch.len()
}
