use async_trait::async_trait;
use tracing::Span;

use crate::config::ProcessorConfig;
use crate::domain::{Batch, ProcessorError};

/// A single step of a processing chain
///
/// A processor receives one batch and returns the batches it produced:
/// - omitting messages (or returning no batches) filters them out
/// - flagging a message with [`Message::fail`](crate::domain::Message::fail)
///   errors just that message
/// - returning `Err` errors the whole batch
///
/// Instances are owned by exactly one lane and never invoked concurrently,
/// so they are free to keep mutable state between calls.
#[async_trait]
pub trait Processor: Send {
    /// Type name used in logs
    fn name(&self) -> &str;

    /// Process one batch
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, ProcessorError>;

    /// Release resources once the owning lane stops
    async fn close(&mut self) {}
}

/// Collaborators handed to a processor constructor
#[derive(Debug, Clone)]
pub struct BuildContext {
    path: Vec<String>,
    lane: usize,
    span: Span,
}

impl BuildContext {
    /// Context for the processor at `index` of the chain owned by `lane`
    pub fn for_processor(lane: usize, index: usize) -> Self {
        let path = vec!["processors".to_string(), index.to_string()];
        let span = tracing::debug_span!("processor", lane, path = %path.join("."));
        Self { path, lane, span }
    }

    /// Path segments addressing this processor within the config
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Dotted form of the path, e.g. `processors.2`
    pub fn label(&self) -> String {
        self.path.join(".")
    }

    /// Index of the lane the processor is built for
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Logging span scoped to this processor
    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Builds processors from their configuration
pub trait ProcessorFactory: Send + Sync {
    fn build(
        &self,
        config: &ProcessorConfig,
        context: &BuildContext,
    ) -> Result<Box<dyn Processor>, ProcessorError>;
}
