use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::error::PipelineError;
use super::lane::{Lane, LaneReport};
use super::lifecycle::{Lifecycle, PipelineState};
use super::source::SharedReceiver;
use super::traits::Pipeline;
use crate::domain::Batch;
use crate::engine::ChainExecutor;

/// Runs N lanes over one shared inbound stream
///
/// Each lane owns an independently built copy of the processor chain, so
/// stateful processors are never called concurrently. Every inbound batch
/// goes to exactly one lane; order is kept within a lane but not across
/// lanes.
///
/// # Example
/// ```rust,ignore
/// let executors = (0..4).map(|lane| build_chain(&config, &registry, lane)).collect::<Result<_, _>>()?;
/// let mut pool = Pool::new(executors)?;
///
/// let (tx, rx) = mpsc::channel(16);
/// let mut results = pool.consume(rx)?;
/// ```
pub struct Pool {
    // Mutex only makes the pool Sync; consume reaches the lanes through get_mut
    lanes: Mutex<Vec<Lane>>,
    size: usize,
    capacity: usize,
    lifecycle: Lifecycle,
}

impl Pool {
    /// Create a pool with one lane per executor
    pub fn new(executors: Vec<ChainExecutor>) -> Result<Self, PipelineError> {
        if executors.is_empty() {
            return Err(PipelineError::NoLanes);
        }

        let lanes: Vec<Lane> = executors
            .into_iter()
            .enumerate()
            .map(|(index, executor)| Lane::new(index, executor))
            .collect();
        let size = lanes.len();

        Ok(Self {
            lanes: Mutex::new(lanes),
            size,
            capacity: size,
            lifecycle: Lifecycle::new(),
        })
    }

    /// Set the outbound buffer size (defaults to the number of lanes)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Number of lanes
    pub fn size(&self) -> usize {
        self.size
    }
}

#[async_trait]
impl Pipeline for Pool {
    fn consume(
        &mut self,
        inbound: mpsc::Receiver<Batch>,
    ) -> Result<mpsc::Receiver<Batch>, PipelineError> {
        match self.lifecycle.state() {
            PipelineState::Created => {}
            PipelineState::Stopped => return Err(PipelineError::Closed),
            _ => return Err(PipelineError::AlreadyStarted),
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(PipelineError::NoRuntime);
        }

        let lanes = std::mem::take(
            self.lanes
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let (outbound, results) = mpsc::channel(self.capacity);
        let source = SharedReceiver::new(inbound);

        self.lifecycle.start();

        let handles: Vec<_> = lanes
            .into_iter()
            .map(|lane| {
                let index = lane.index();
                let mut source = source.clone();
                let outbound = outbound.clone();
                let lifecycle = self.lifecycle.clone();

                let handle = tokio::spawn(async move {
                    lane.run_guarded(&mut source, outbound, lifecycle).await
                });
                (index, handle)
            })
            .collect();

        tokio::spawn(supervise(
            handles,
            source,
            outbound,
            self.lifecycle.clone(),
        ));

        info!(lanes = self.size, capacity = self.capacity, "Pipeline pool started");
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

impl Drop for Pool {
    fn drop(&mut self) {
        self.lifecycle.request_stop();
    }
}

/// Join every lane, then close outbound and mark the pool stopped
async fn supervise(
    handles: Vec<(usize, JoinHandle<Option<LaneReport>>)>,
    mut source: SharedReceiver,
    outbound: mpsc::Sender<Batch>,
    lifecycle: Lifecycle,
) {
    let mut totals = LaneReport::default();

    for (index, handle) in handles {
        match handle.await {
            Ok(Some(report)) => {
                totals.batches += report.batches;
                totals.delivered += report.delivered;
                totals.filtered += report.filtered;
                totals.failed += report.failed;
            }
            // Already recorded by the lane itself
            Ok(None) => {}
            Err(err) => {
                error!(lane = index, error = %err, "Lane task did not finish");
                lifecycle.fail(PipelineError::LanePanicked { lane: index });
            }
        }
    }

    lifecycle.complete(&mut source, outbound).await;

    info!(
        batches = totals.batches,
        delivered = totals.delivered,
        filtered = totals.filtered,
        failed = totals.failed,
        "Pipeline pool stopped"
    );
}
