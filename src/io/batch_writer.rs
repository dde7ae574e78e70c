use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::error::IoError;
use crate::domain::{Batch, Outcome};

/// Write one payload per line
pub async fn write_batch<W>(batch: &Batch, writer: &mut W) -> Result<(), IoError>
where
    W: AsyncWrite + Unpin + Send,
{
    for message in batch {
        writer.write_all(message.payload()).await?;
        writer.write_all(b"\n").await?;
    }
    Ok(())
}

/// Write every outbound batch and acknowledge it once flushed
///
/// Runs until the pipeline closes its outbound stream. If a write fails the
/// batch is resolved as undelivered and the error is returned; batches still
/// queued are left to the pipeline's own shutdown handling.
pub async fn drain_outbound<W>(
    mut results: mpsc::Receiver<Batch>,
    mut writer: W,
) -> Result<usize, IoError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut written = 0;

    while let Some(batch) = results.recv().await {
        let flushed = async {
            write_batch(&batch, &mut writer).await?;
            writer.flush().await?;
            Ok::<_, IoError>(())
        }
        .await;

        if let Err(err) = flushed {
            batch.resolve_all(Outcome::Undelivered);
            return Err(err);
        }

        batch.ack();
        written += batch.len();
    }

    Ok(written)
}
