use lanes::prelude::*;
use tokio::sync::mpsc;

/// Build `count` batches of `per_batch` short text messages
pub fn generate_batches(count: usize, per_batch: usize) -> Vec<Batch> {
    (0..count)
        .map(|b| {
            Batch::from_payloads((0..per_batch).map(|m| format!("batch-{b}-message-{m}")))
        })
        .collect()
}

/// A chain config of `depth` processors cycling through cheap builtins
#[allow(dead_code)]
pub fn chain_config(threads: i64, depth: usize) -> Config {
    let kinds = ["uppercase", "noop", "metadata"];
    let processors = (0..depth)
        .map(|i| match kinds[i % kinds.len()] {
            "metadata" => ProcessorConfig::new("metadata")
                .with_option("key", "stage")
                .with_option("value", i.to_string()),
            kind => ProcessorConfig::new(kind),
        })
        .collect();
    Config::new(threads, processors)
}

/// Push every batch through the pipeline and count what comes out
#[allow(dead_code)]
pub async fn run_pipeline(mut pipeline: Box<dyn Pipeline>, batches: Vec<Batch>) -> usize {
    let (tx, rx) = mpsc::channel(64);
    let mut results = pipeline.consume(rx).unwrap();

    tokio::spawn(async move {
        for batch in batches {
            tx.send(batch).await.unwrap();
        }
    });

    let mut messages = 0;
    while let Some(batch) = results.recv().await {
        batch.ack();
        messages += batch.len();
    }

    pipeline.wait().await.unwrap();
    messages
}
