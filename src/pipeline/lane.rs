use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;
use tracing::{debug, error};

use super::error::PipelineError;
use super::lifecycle::Lifecycle;
use super::source::BatchSource;
use crate::domain::{Batch, Outcome};
use crate::engine::ChainExecutor;

/// Lifecycle of a single lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    Starting,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for LaneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What a lane did before it stopped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneReport {
    pub lane: usize,
    pub batches: usize,
    pub delivered: usize,
    pub filtered: usize,
    pub failed: usize,
}

/// One worker: a private chain instance plus its receive/execute/publish loop
pub(crate) struct Lane {
    index: usize,
    executor: ChainExecutor,
    state: LaneState,
}

impl Lane {
    pub(crate) fn new(index: usize, executor: ChainExecutor) -> Self {
        Self {
            index,
            executor,
            state: LaneState::Starting,
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Run the lane, turning a panic into a pipeline failure
    ///
    /// Returns `None` if the lane panicked.
    pub(crate) async fn run_guarded<S: BatchSource>(
        self,
        source: &mut S,
        outbound: mpsc::Sender<Batch>,
        lifecycle: Lifecycle,
    ) -> Option<LaneReport> {
        let index = self.index;
        let result = AssertUnwindSafe(self.run(source, outbound, lifecycle.clone()))
            .catch_unwind()
            .await;

        match result {
            Ok(report) => Some(report),
            Err(payload) => {
                let panic_msg = panic_message(payload.as_ref());
                error!(lane = index, panic = %panic_msg, "Lane panicked");
                lifecycle.fail(PipelineError::LanePanicked { lane: index });
                None
            }
        }
    }

    /// Receive, execute, publish until the input ends or stop is requested
    ///
    /// The stop signal is only observed between batches: a batch that was
    /// received is always run through the whole chain and published.
    pub(crate) async fn run<S: BatchSource>(
        mut self,
        source: &mut S,
        outbound: mpsc::Sender<Batch>,
        lifecycle: Lifecycle,
    ) -> LaneReport {
        let stop = lifecycle.stop_token();
        let mut report = LaneReport {
            lane: self.index,
            ..LaneReport::default()
        };

        self.transition(LaneState::Running);

        let result = loop {
            let next = tokio::select! {
                biased;
                _ = stop.cancelled() => None,
                batch = source.next_batch() => batch,
            };

            let Some(batch) = next else {
                break Ok(());
            };

            let output = self.executor.execute(batch).await;
            report.batches += 1;
            report.delivered += output.delivered();
            report.filtered += output.filtered;
            report.failed += output.failed;

            if let Err(err) = publish(self.index, output.batches, &outbound).await {
                break Err(err);
            }
        };

        self.transition(LaneState::Draining);
        match result {
            Ok(()) => lifecycle.begin_drain(),
            Err(err) => {
                error!(lane = self.index, error = %err, "Lane failed");
                lifecycle.fail(err);
            }
        }

        self.executor.close().await;
        self.transition(LaneState::Stopped);

        debug!(
            lane = report.lane,
            batches = report.batches,
            delivered = report.delivered,
            filtered = report.filtered,
            failed = report.failed,
            "Lane stopped"
        );
        report
    }

    fn transition(&mut self, next: LaneState) {
        debug!(lane = self.index, from = %self.state, to = %next, "Lane state change");
        self.state = next;
    }
}

/// Forward batches in order; on a closed outbound, report everything unsent
async fn publish(
    lane: usize,
    batches: Vec<Batch>,
    outbound: &mpsc::Sender<Batch>,
) -> Result<(), PipelineError> {
    let mut batches = batches.into_iter();
    while let Some(batch) = batches.next() {
        if let Err(SendError(batch)) = outbound.send(batch).await {
            batch.resolve_all(Outcome::Undelivered);
            for rest in batches {
                rest.resolve_all(Outcome::Undelivered);
            }
            return Err(PipelineError::OutboundClosed { lane });
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
