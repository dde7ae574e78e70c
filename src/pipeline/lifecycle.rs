use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::PipelineError;
use super::source::BatchSource;
use crate::domain::{Batch, Outcome};

/// Lifecycle of a pipeline as seen from the outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Built, not consuming yet
    Created,
    /// Lanes are pulling from the inbound stream
    Running,
    /// Inbound ended or stop was requested; in-flight batches are finishing
    Draining,
    /// Every lane exited and the outbound stream is closed
    Stopped,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

struct Shared {
    state: watch::Sender<PipelineState>,
    stop: CancellationToken,
    error: OnceLock<PipelineError>,
}

/// Shared state machine, stop signal, and first structural error of a pipeline
#[derive(Clone)]
pub(crate) struct Lifecycle {
    shared: Arc<Shared>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(PipelineState::Created);
        Self {
            shared: Arc::new(Shared {
                state,
                stop: CancellationToken::new(),
                error: OnceLock::new(),
            }),
        }
    }

    pub(crate) fn state(&self) -> PipelineState {
        *self.shared.state.borrow()
    }

    pub(crate) fn stop_token(&self) -> CancellationToken {
        self.shared.stop.clone()
    }

    /// Created → Running. Returns false from any other state.
    pub(crate) fn start(&self) -> bool {
        self.transition(|state| match state {
            PipelineState::Created => Some(PipelineState::Running),
            _ => None,
        })
    }

    /// Request a graceful stop; safe to call any number of times
    pub(crate) fn request_stop(&self) {
        self.shared.stop.cancel();
        self.transition(|state| match state {
            // Nothing was spawned, so there is nothing to drain
            PipelineState::Created => Some(PipelineState::Stopped),
            PipelineState::Running => Some(PipelineState::Draining),
            _ => None,
        });
    }

    /// Running → Draining, used when a lane sees the end of its input
    pub(crate) fn begin_drain(&self) {
        self.transition(|state| match state {
            PipelineState::Running => Some(PipelineState::Draining),
            _ => None,
        });
    }

    /// Record a structural failure and stop every lane
    pub(crate) fn fail(&self, error: PipelineError) {
        if self.shared.error.set(error).is_err() {
            debug!("Pipeline already holds an error, keeping the first one");
        }
        self.request_stop();
    }

    pub(crate) fn error(&self) -> Option<PipelineError> {
        self.shared.error.get().cloned()
    }

    /// Drain leftovers, close outbound, and publish `Stopped`
    ///
    /// Must only run once every lane has exited. Batches still queued in
    /// the inbound channel at this point were never picked up because of a
    /// stop request; their messages are reported `Undelivered`.
    pub(crate) async fn complete<S: BatchSource>(
        &self,
        source: &mut S,
        outbound: mpsc::Sender<Batch>,
    ) {
        let leftover = source.drain_remaining().await;
        if !leftover.is_empty() {
            let messages: usize = leftover.iter().map(Batch::len).sum();
            warn!(
                batches = leftover.len(),
                messages, "Pipeline stopped with unprocessed input"
            );
            for batch in &leftover {
                batch.resolve_all(Outcome::Undelivered);
            }
        }

        // Dropping the last sender is what closes the outbound stream
        drop(outbound);
        self.transition(|state| match state {
            PipelineState::Stopped => None,
            _ => Some(PipelineState::Stopped),
        });
    }

    /// Wait until the pipeline reaches `Stopped`
    pub(crate) async fn wait(&self) -> Result<(), PipelineError> {
        let mut rx = self.shared.state.subscribe();
        loop {
            if *rx.borrow_and_update() == PipelineState::Stopped {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }

        match self.error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn transition<F>(&self, next: F) -> bool
    where
        F: FnOnce(PipelineState) -> Option<PipelineState>,
    {
        self.shared.state.send_if_modified(|state| match next(*state) {
            Some(new_state) => {
                debug!(from = %state, to = %new_state, "Pipeline state change");
                *state = new_state;
                true
            }
            None => false,
        })
    }
}
