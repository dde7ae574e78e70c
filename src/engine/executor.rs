use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::domain::{AckHandle, Batch, Outcome};
use crate::processor::Processor;

/// Result of running one batch through a chain
#[derive(Debug, Default)]
pub struct ChainOutput {
    /// Surviving batches, in the order the last processor produced them
    pub batches: Vec<Batch>,
    /// Messages dropped by a processor
    pub filtered: usize,
    /// Messages errored by a processor, individually or with their batch
    pub failed: usize,
}

impl ChainOutput {
    /// Total number of surviving messages
    pub fn delivered(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}

/// Applies an ordered list of processors to batches
///
/// Processors run strictly in order and each one only sees what its
/// predecessor produced. Messages that do not survive a step are resolved
/// on their own acknowledgment handle:
/// - flagged with an error → `Outcome::Failed`, removed from the batch
/// - no copy left in any output of the step → `Outcome::Filtered`
/// - step returned `Err` → every message of that batch is `Outcome::Failed`
///   and the remaining steps are skipped for it
pub struct ChainExecutor {
    processors: Vec<Box<dyn Processor>>,
}

impl ChainExecutor {
    /// Create an executor over the given processors
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        Self { processors }
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Names of the processors, in chain order
    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run one batch through the whole chain
    pub async fn execute(&mut self, batch: Batch) -> ChainOutput {
        let mut output = ChainOutput::default();
        if batch.is_empty() {
            return output;
        }

        let mut pending = vec![batch];

        for (index, processor) in self.processors.iter_mut().enumerate() {
            // Copies made by a fan-out share one handle, so survival is judged
            // across every batch of the stage rather than per batch
            let entering: HashMap<u64, AckHandle> = pending
                .iter()
                .flat_map(Batch::iter)
                .map(|m| (m.ack_handle().id(), m.ack_handle().clone()))
                .collect();
            let mut settled = HashSet::with_capacity(entering.len());
            let mut next = Vec::with_capacity(pending.len());

            for batch in pending {
                let handles: Vec<AckHandle> =
                    batch.iter().map(|m| m.ack_handle().clone()).collect();

                match processor.process(batch).await {
                    Ok(results) => {
                        for mut result in results {
                            for mut msg in result.take_failed() {
                                settled.insert(msg.ack_handle().id());
                                if let Some(err) = msg.take_error() {
                                    warn!(
                                        index,
                                        processor = processor.name(),
                                        error = %err,
                                        "Message failed"
                                    );
                                    msg.reject(Outcome::Failed(err));
                                }
                                output.failed += 1;
                            }

                            settled.extend(result.iter().map(|m| m.ack_handle().id()));
                            if !result.is_empty() {
                                next.push(result);
                            }
                        }
                    }
                    Err(err) => {
                        warn!(
                            index,
                            processor = processor.name(),
                            size = handles.len(),
                            error = %err,
                            "Batch failed, skipping remaining processors"
                        );
                        for handle in &handles {
                            settled.insert(handle.id());
                            handle.resolve(Outcome::Failed(err.clone()));
                        }
                        output.failed += handles.len();
                    }
                }
            }

            for (id, handle) in &entering {
                if !settled.contains(id) {
                    handle.resolve(Outcome::Filtered);
                    output.filtered += 1;
                }
            }

            pending = next;
            if pending.is_empty() {
                debug!(index, "Nothing left to process");
                break;
            }
        }

        output.batches = pending;
        output
    }

    /// Close every processor, in chain order
    pub async fn close(&mut self) {
        for processor in self.processors.iter_mut() {
            processor.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, ProcessorError};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Append(&'static str);

    #[async_trait]
    impl Processor for Append {
        fn name(&self) -> &str {
            "append"
        }

        async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
            for msg in batch.iter_mut() {
                let mut payload = msg.payload().to_vec();
                payload.extend_from_slice(self.0.as_bytes());
                msg.set_payload(payload);
            }
            Ok(vec![batch])
        }
    }

    struct FailOn(&'static str);

    #[async_trait]
    impl Processor for FailOn {
        fn name(&self) -> &str {
            "fail_on"
        }

        async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
            for msg in batch.iter_mut() {
                if msg.payload() == self.0.as_bytes() {
                    msg.fail(ProcessorError::Rejected(self.0.to_string()));
                }
            }
            Ok(vec![batch])
        }
    }

    struct DropAll;

    #[async_trait]
    impl Processor for DropAll {
        fn name(&self) -> &str {
            "drop_all"
        }

        async fn process(&mut self, _batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
            Ok(vec![])
        }
    }

    struct BreakBatch;

    #[async_trait]
    impl Processor for BreakBatch {
        fn name(&self) -> &str {
            "break_batch"
        }

        async fn process(&mut self, _batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
            Err(ProcessorError::InvalidBatch("malformed".to_string()))
        }
    }

    struct SplitEach;

    #[async_trait]
    impl Processor for SplitEach {
        fn name(&self) -> &str {
            "split_each"
        }

        async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
            Ok(batch.into_iter().map(|m| Batch::from(vec![m])).collect())
        }
    }

    /// Emits the batch plus a renamed copy of it
    struct Duplicate;

    #[async_trait]
    impl Processor for Duplicate {
        fn name(&self) -> &str {
            "duplicate"
        }

        async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
            let mut copy = batch.clone();
            for msg in copy.iter_mut() {
                msg.set_payload("copy");
            }
            Ok(vec![batch, copy])
        }
    }

    /// Drops every message whose payload is "copy"
    struct DropCopies;

    #[async_trait]
    impl Processor for DropCopies {
        fn name(&self) -> &str {
            "drop_copies"
        }

        async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
            batch.retain(|msg| msg.payload() != b"copy");
            Ok(vec![batch])
        }
    }

    /// Records every payload it sees, and counts close calls
    struct Spy {
        seen: Arc<std::sync::Mutex<Vec<String>>>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Processor for Spy {
        fn name(&self) -> &str {
            "spy"
        }

        async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, ProcessorError> {
            self.seen.lock().unwrap().extend(batch.payload_strings());
            Ok(vec![batch])
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn spy() -> (Spy, Arc<std::sync::Mutex<Vec<String>>>, Arc<AtomicUsize>) {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicUsize::new(0));
        (
            Spy {
                seen: seen.clone(),
                closed: closed.clone(),
            },
            seen,
            closed,
        )
    }

    #[tokio::test]
    async fn runs_processors_in_order() {
        let mut executor = ChainExecutor::new(vec![Box::new(Append("a")), Box::new(Append("b"))]);

        let output = executor.execute(Batch::from_payloads(["x", "y"])).await;

        assert_eq!(output.batches.len(), 1);
        assert_eq!(output.batches[0].payload_strings(), vec!["xab", "yab"]);
        assert_eq!(output.delivered(), 2);
        assert_eq!(output.filtered, 0);
        assert_eq!(output.failed, 0);
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let (spy, seen, _) = spy();
        let mut executor = ChainExecutor::new(vec![Box::new(spy)]);

        let output = executor.execute(Batch::new()).await;

        assert!(output.batches.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_chain_passes_batch_through() {
        let mut executor = ChainExecutor::new(vec![]);
        assert!(executor.is_empty());

        let output = executor.execute(Batch::from_payloads(["x"])).await;
        assert_eq!(output.batches[0].payload_strings(), vec!["x"]);
    }

    #[tokio::test]
    async fn failed_messages_skip_later_processors() {
        let (spy, seen, _) = spy();
        let mut executor = ChainExecutor::new(vec![Box::new(FailOn("bad")), Box::new(spy)]);

        let (good, good_rx) = Message::with_ack("good");
        let (bad, bad_rx) = Message::with_ack("bad");
        let output = executor.execute(Batch::from(vec![good, bad])).await;

        assert_eq!(output.batches[0].payload_strings(), vec!["good"]);
        assert_eq!(output.failed, 1);
        assert_eq!(*seen.lock().unwrap(), vec!["good"]);

        assert_eq!(
            bad_rx.outcome().await,
            Outcome::Failed(ProcessorError::Rejected("bad".to_string()))
        );

        output.batches[0].ack();
        assert!(good_rx.outcome().await.is_delivered());
    }

    #[tokio::test]
    async fn dropped_messages_are_reported_filtered() {
        let (spy, seen, _) = spy();
        let mut executor = ChainExecutor::new(vec![Box::new(DropAll), Box::new(spy)]);

        let (msg, rx) = Message::with_ack("gone");
        let output = executor.execute(Batch::from(vec![msg])).await;

        assert!(output.batches.is_empty());
        assert_eq!(output.filtered, 1);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(rx.outcome().await, Outcome::Filtered);
    }

    #[tokio::test]
    async fn batch_error_fails_every_message() {
        let (spy, seen, _) = spy();
        let mut executor = ChainExecutor::new(vec![Box::new(BreakBatch), Box::new(spy)]);

        let (m1, rx1) = Message::with_ack("1");
        let (m2, rx2) = Message::with_ack("2");
        let output = executor.execute(Batch::from(vec![m1, m2])).await;

        assert!(output.batches.is_empty());
        assert_eq!(output.failed, 2);
        assert!(seen.lock().unwrap().is_empty());

        let expected = Outcome::Failed(ProcessorError::InvalidBatch("malformed".to_string()));
        assert_eq!(rx1.outcome().await, expected);
        assert_eq!(rx2.outcome().await, expected);
    }

    #[tokio::test]
    async fn split_batches_each_run_the_rest_of_the_chain() {
        let mut executor = ChainExecutor::new(vec![Box::new(SplitEach), Box::new(Append("!"))]);

        let output = executor.execute(Batch::from_payloads(["a", "b", "c"])).await;

        let payloads: Vec<Vec<String>> = output.batches.iter().map(Batch::payload_strings).collect();
        assert_eq!(payloads, vec![vec!["a!"], vec!["b!"], vec!["c!"]]);
    }

    #[tokio::test]
    async fn surviving_copy_keeps_its_message_unfiltered() {
        let mut executor =
            ChainExecutor::new(vec![Box::new(Duplicate), Box::new(DropCopies)]);

        let (msg, rx) = Message::with_ack("orig");
        let output = executor.execute(Batch::from(vec![msg])).await;

        let payloads: Vec<String> = output.batches.iter().flat_map(Batch::payload_strings).collect();
        assert_eq!(payloads, vec!["orig"]);
        assert_eq!(output.filtered, 0);

        for batch in &output.batches {
            batch.ack();
        }
        assert_eq!(rx.outcome().await, Outcome::Delivered);
    }

    #[tokio::test]
    async fn dropping_every_copy_filters_once() {
        let mut executor = ChainExecutor::new(vec![Box::new(Duplicate), Box::new(DropAll)]);

        let (msg, rx) = Message::with_ack("orig");
        let output = executor.execute(Batch::from(vec![msg])).await;

        assert!(output.batches.is_empty());
        assert_eq!(output.filtered, 1);
        assert_eq!(rx.outcome().await, Outcome::Filtered);
    }

    #[tokio::test]
    async fn close_reaches_every_processor() {
        let (first, _, first_closed) = spy();
        let (second, _, second_closed) = spy();
        let mut executor = ChainExecutor::new(vec![Box::new(first), Box::new(second)]);

        executor.close().await;

        assert_eq!(first_closed.load(Ordering::SeqCst), 1);
        assert_eq!(second_closed.load(Ordering::SeqCst), 1);
        assert_eq!(executor.names(), vec!["spy", "spy"]);
    }
}
