use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tracing::debug;

use super::error::IoError;
use crate::domain::Batch;

/// Largest batch the reader will assemble from lines that are already buffered
pub const DEFAULT_MAX_BATCH: usize = 64;

/// Longest line accepted before the stream fails (1 MiB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1 << 20;

/// Async stream of batches built from newline-delimited input
///
/// Each line becomes one message, kept as raw bytes with the trailing
/// `\n` (and `\r`, if any) removed. Lines that are ready together are grouped
/// into one batch of at most `max_batch` messages; a slow producer yields
/// smaller batches rather than waiting for a full one.
pub struct LineBatchStream {
    inner: Pin<Box<dyn Stream<Item = Result<Batch, IoError>> + Send>>,
}

impl LineBatchStream {
    /// Create a batch stream from an async reader
    pub fn new<R>(reader: R, max_batch: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::with_max_line_length(reader, max_batch, DEFAULT_MAX_LINE_LENGTH)
    }

    /// Like [`new`](Self::new), failing on lines longer than `max_line_length`
    pub fn with_max_line_length<R>(reader: R, max_batch: usize, max_line_length: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let codec =
            AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), max_line_length);

        let stream = FramedRead::new(reader, codec)
            .ready_chunks(max_batch.max(1))
            .map(|lines| {
                lines
                    .into_iter()
                    .map(|line| line.map(|bytes| strip_cr(&bytes).to_vec()))
                    .collect::<Result<Vec<Vec<u8>>, _>>()
                    .map(Batch::from_payloads)
                    .map_err(IoError::from)
            });

        Self {
            inner: Box::pin(stream),
        }
    }

    /// Create a batch stream from a file path
    ///
    /// # Example
    /// ```rust,ignore
    /// let batches = LineBatchStream::from_file("input.txt", DEFAULT_MAX_BATCH).await?;
    /// ```
    pub async fn from_file(path: impl AsRef<Path>, max_batch: usize) -> Result<Self, IoError> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(file, max_batch))
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl Stream for LineBatchStream {
    type Item = Result<Batch, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Forward every batch from `stream` into a pipeline's inbound channel
///
/// Returns the number of batches sent. Dropping `inbound` when this returns
/// is what tells the pipeline its input is finished.
pub async fn feed<S>(mut stream: S, inbound: mpsc::Sender<Batch>) -> Result<usize, IoError>
where
    S: Stream<Item = Result<Batch, IoError>> + Unpin,
{
    let mut sent = 0;

    while let Some(batch) = stream.next().await {
        let batch = batch?;
        if inbound.send(batch).await.is_err() {
            return Err(IoError::InputClosed(sent));
        }
        sent += 1;
    }

    debug!(batches = sent, "Input exhausted");
    Ok(sent)
}
