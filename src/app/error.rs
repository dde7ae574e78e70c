use std::io;
use thiserror::Error;
use tokio::task::JoinError;

use crate::config::ConfigError;
use crate::io::IoError;
use crate::pipeline::PipelineError;

/// Top-level application errors unifying all layer errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Stream IO error: {0}")]
    Stream(#[from] IoError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Task failed: {0}")]
    Task(#[from] JoinError),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}
