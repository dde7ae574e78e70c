use std::io;
use thiserror::Error;
use tokio_util::codec::AnyDelimiterCodecError;

/// IO-level errors for line input and batch output
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Line decoding error: {0}")]
    Lines(#[from] AnyDelimiterCodecError),

    #[error("Pipeline input closed after {0} batches")]
    InputClosed(usize),
}
