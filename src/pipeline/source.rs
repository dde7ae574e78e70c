use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::domain::Batch;

/// Where a lane pulls its batches from
pub(crate) trait BatchSource: Send {
    /// Next batch, or `None` once the upstream has closed the stream
    ///
    /// Must be cancel safe: a lane races it against the stop signal.
    fn next_batch(&mut self) -> impl Future<Output = Option<Batch>> + Send;

    /// Close the stream and take whatever is still buffered
    fn drain_remaining(&mut self) -> impl Future<Output = Vec<Batch>> + Send;
}

impl BatchSource for mpsc::Receiver<Batch> {
    async fn next_batch(&mut self) -> Option<Batch> {
        self.recv().await
    }

    async fn drain_remaining(&mut self) -> Vec<Batch> {
        close_and_drain(self)
    }
}

/// Inbound receiver shared by every lane of a pool
///
/// The channel decides which lane gets each batch: whoever holds the lock
/// while a batch arrives receives it, so delivery is exclusive. The lock
/// is released before the batch is processed.
#[derive(Clone)]
pub(crate) struct SharedReceiver {
    inner: Arc<Mutex<mpsc::Receiver<Batch>>>,
}

impl SharedReceiver {
    pub(crate) fn new(receiver: mpsc::Receiver<Batch>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(receiver)),
        }
    }
}

impl BatchSource for SharedReceiver {
    async fn next_batch(&mut self) -> Option<Batch> {
        let mut rx = self.inner.lock().await;
        rx.recv().await
    }

    async fn drain_remaining(&mut self) -> Vec<Batch> {
        let mut rx = self.inner.lock().await;
        close_and_drain(&mut rx)
    }
}

fn close_and_drain(rx: &mut mpsc::Receiver<Batch>) -> Vec<Batch> {
    rx.close();
    let mut remaining = Vec::new();
    while let Ok(batch) = rx.try_recv() {
        remaining.push(batch);
    }
    remaining
}
