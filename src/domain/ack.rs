use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use super::error::ProcessorError;

static NEXT_ACK_ID: AtomicU64 = AtomicU64::new(1);

/// Final outcome of a message, reported back to whoever produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Downstream consumed and acknowledged the message
    Delivered,

    /// A processor dropped the message on purpose
    Filtered,

    /// A processor errored the message, or the batch holding it
    Failed(ProcessorError),

    /// The pipeline never handed the message to downstream
    Undelivered,
}

impl Outcome {
    /// Check if the outcome counts as a success
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

struct AckSlot {
    id: u64,
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

/// Shared reference to the acknowledgment slot of one message
///
/// Clones point at the same slot, so a message copied by a splitting
/// processor still resolves its upstream exactly once: the first
/// outcome wins, later ones are discarded.
#[derive(Clone)]
pub struct AckHandle {
    slot: Arc<AckSlot>,
}

impl AckHandle {
    /// Create a handle nobody listens to
    pub fn detached() -> Self {
        Self::from_sender(None)
    }

    /// Create a handle together with the receiving half for upstream
    pub fn pair() -> (Self, AckReceiver) {
        let (tx, rx) = oneshot::channel();
        (Self::from_sender(Some(tx)), AckReceiver { rx })
    }

    fn from_sender(tx: Option<oneshot::Sender<Outcome>>) -> Self {
        Self {
            slot: Arc::new(AckSlot {
                id: NEXT_ACK_ID.fetch_add(1, Ordering::Relaxed),
                tx: Mutex::new(tx),
            }),
        }
    }

    /// Process-unique identifier shared by every clone of this handle
    pub fn id(&self) -> u64 {
        self.slot.id
    }

    /// Report an outcome
    ///
    /// Returns true if this call resolved the slot, false if it had already
    /// been resolved (or had no listener attached).
    pub fn resolve(&self, outcome: Outcome) -> bool {
        let sender = match self.slot.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            // A dropped receiver means upstream stopped caring, not an error
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Check if an outcome was already reported
    ///
    /// Always true for a detached handle, which has nobody to report to.
    pub fn is_resolved(&self) -> bool {
        match self.slot.tx.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle")
            .field("id", &self.slot.id)
            .finish()
    }
}

/// Upstream end of an acknowledgment slot
#[derive(Debug)]
pub struct AckReceiver {
    rx: oneshot::Receiver<Outcome>,
}

impl AckReceiver {
    /// Wait for the message outcome
    ///
    /// If every handle is dropped without resolving, the message is
    /// reported as `Undelivered`.
    pub async fn outcome(self) -> Outcome {
        self.rx.await.unwrap_or(Outcome::Undelivered)
    }

    /// Non-blocking check for an outcome
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Outcome::Undelivered),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_resolution_wins() {
        let (handle, rx) = AckHandle::pair();
        let copy = handle.clone();

        assert!(handle.resolve(Outcome::Filtered));
        assert!(!copy.resolve(Outcome::Delivered));
        assert!(copy.is_resolved());

        assert_eq!(rx.outcome().await, Outcome::Filtered);
    }

    #[tokio::test]
    async fn dropped_handle_reports_undelivered() {
        let (handle, rx) = AckHandle::pair();
        drop(handle);

        assert_eq!(rx.outcome().await, Outcome::Undelivered);
    }

    #[test]
    fn clones_share_id() {
        let handle = AckHandle::detached();
        let copy = handle.clone();
        assert_eq!(handle.id(), copy.id());
        assert_ne!(handle.id(), AckHandle::detached().id());
    }

    #[test]
    fn detached_handle_never_resolves() {
        let handle = AckHandle::detached();
        assert!(!handle.resolve(Outcome::Delivered));
    }

    #[test]
    fn try_outcome_before_and_after() {
        let (handle, mut rx) = AckHandle::pair();
        assert_eq!(rx.try_outcome(), None);

        handle.resolve(Outcome::Delivered);
        assert_eq!(rx.try_outcome(), Some(Outcome::Delivered));
    }
}
