//! Prelude module for convenient imports
//!
//! Import everything you need with: `use lanes::prelude::*;`

// Domain types
pub use crate::domain::{AckHandle, AckReceiver, Batch, Message, Outcome, ProcessorError};

// Config types
pub use crate::config::{Config, ConfigError, ProcessorConfig};

// Processor types
pub use crate::processor::{BuildContext, Constructor, Processor, ProcessorFactory, Registry};

// Engine types
pub use crate::engine::{ChainExecutor, ChainOutput};

// Pipeline types
pub use crate::pipeline::{
    DirectPipeline, LaneReport, LaneState, Pipeline, PipelineError, PipelineState, Pool,
    build_chain, build_pipeline,
};

// IO types
pub use crate::io::{DEFAULT_MAX_BATCH, IoError, LineBatchStream, drain_outbound, feed, write_batch};

// App types
pub use crate::app::{AppError, CliApp};
