use thiserror::Error;

/// Errors raised by processors, either while being built or while processing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("Message rejected: {0}")]
    Rejected(String),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Unknown processor type: {0}")]
    UnknownType(String),

    #[error("Invalid config for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Processor failed: {0}")]
    Failed(String),
}

impl ProcessorError {
    /// Shorthand for an invalid option error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
