use std::time::Duration;
use thiserror::Error;

use crate::domain::ProcessorError;

/// Structural pipeline errors surfaced to the pipeline owner
///
/// Per-message and per-batch processing errors never show up here; they
/// travel with the messages through their acknowledgment handles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Failed to create processor {index} ('{kind}'): {source}")]
    Build {
        index: usize,
        kind: String,
        source: ProcessorError,
    },

    #[error("Pipeline already started")]
    AlreadyStarted,

    #[error("Pipeline is closed")]
    Closed,

    #[error("Pipeline needs at least one lane")]
    NoLanes,

    #[error("Lane {lane} could not deliver results: outbound stream closed")]
    OutboundClosed { lane: usize },

    #[error("Lane {lane} panicked")]
    LanePanicked { lane: usize },

    #[error("Pipeline must be started from within a tokio runtime")]
    NoRuntime,

    #[error("Timed out after {0:?} waiting for pipeline to stop")]
    Timeout(Duration),
}
