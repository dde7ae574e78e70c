use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use super::error::PipelineError;
use super::lane::Lane;
use super::lifecycle::{Lifecycle, PipelineState};
use super::traits::Pipeline;
use crate::domain::Batch;
use crate::engine::ChainExecutor;

/// Single chain wired straight between inbound and outbound
///
/// Used when no parallelism is configured. Behaves like a one-lane pool
/// without the shared receiver and lane supervision, and keeps the
/// inbound order end to end (as long as no processor splits batches).
pub struct DirectPipeline {
    lane: Mutex<Option<Lane>>,
    capacity: usize,
    lifecycle: Lifecycle,
}

impl DirectPipeline {
    /// Create a direct pipeline around one chain
    pub fn new(executor: ChainExecutor) -> Self {
        Self {
            lane: Mutex::new(Some(Lane::new(0, executor))),
            capacity: 1,
            lifecycle: Lifecycle::new(),
        }
    }

    fn lane_taken(&mut self) -> bool {
        self.lane
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Set the outbound buffer size (defaults to 1)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

#[async_trait]
impl Pipeline for DirectPipeline {
    fn consume(
        &mut self,
        inbound: mpsc::Receiver<Batch>,
    ) -> Result<mpsc::Receiver<Batch>, PipelineError> {
        if self.lifecycle.state() == PipelineState::Stopped {
            return Err(PipelineError::Closed);
        }
        if self.lane_taken() {
            return Err(PipelineError::AlreadyStarted);
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(PipelineError::NoRuntime);
        }

        let lane = self
            .lane
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(PipelineError::AlreadyStarted)?;

        let (outbound, results) = mpsc::channel(self.capacity);
        let lifecycle = self.lifecycle.clone();
        lifecycle.start();

        tokio::spawn(async move {
            let mut source = inbound;
            lane.run_guarded(&mut source, outbound.clone(), lifecycle.clone())
                .await;
            lifecycle.complete(&mut source, outbound).await;
            info!("Direct pipeline stopped");
        });

        Ok(results)
    }

    fn stop(&self) {
        self.lifecycle.request_stop();
    }

    fn state(&self) -> PipelineState {
        self.lifecycle.state()
    }

    async fn wait(&self) -> Result<(), PipelineError> {
        self.lifecycle.wait().await
    }
}

impl Drop for DirectPipeline {
    fn drop(&mut self) {
        self.lifecycle.request_stop();
    }
}
