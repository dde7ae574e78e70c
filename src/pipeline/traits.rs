use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::PipelineError;
use super::lifecycle::PipelineState;
use crate::domain::Batch;

/// A message stream endpoint: batches go in, processed batches come out
///
/// The pooled and the direct implementations behave the same from the
/// outside; only throughput and cross-batch ordering differ.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Start consuming `inbound` and return the outbound stream
    ///
    /// The outbound stream ends once the pipeline has stopped and every
    /// result has been handed over. Closing `inbound` (dropping every sender)
    /// drains and stops the pipeline.
    fn consume(
        &mut self,
        inbound: mpsc::Receiver<Batch>,
    ) -> Result<mpsc::Receiver<Batch>, PipelineError>;

    /// Request a graceful stop; in-flight batches still complete
    ///
    /// Calling this more than once, or after the pipeline stopped, does nothing.
    fn stop(&self);

    /// Current lifecycle state
    fn state(&self) -> PipelineState;

    /// Wait until the pipeline has fully stopped
    ///
    /// Returns the first structural error if one brought the pipeline down.
    async fn wait(&self) -> Result<(), PipelineError>;

    /// Like [`wait`](Pipeline::wait), giving up after `timeout`
    async fn wait_timeout(&self, timeout: Duration) -> Result<(), PipelineError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| PipelineError::Timeout(timeout))?
    }
}
