//! Delivery queue - bounded channel from writers to the delivery worker

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::DispatcherError;

/// Producer side of the delivery queue.
///
/// The sender lives behind an atomic slot so `seal` can retire it while
/// writers are still using it. A writer that loaded the sender before the
/// seal finishes its send; the worker only sees the end of the channel once
/// every such in-flight send has completed.
pub(crate) struct DeliveryQueue {
    sender: ArcSwapOption<mpsc::Sender<Bytes>>,
    capacity: usize,
}

impl DeliveryQueue {
    /// Create a queue holding at most `capacity` payloads
    pub(crate) fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        let queue = Self {
            sender: ArcSwapOption::from_pointee(tx),
            capacity,
        };
        (queue, rx)
    }

    /// Queue a payload, waiting while the queue is full
    pub(crate) async fn enqueue(&self, payload: Bytes) -> Result<(), DispatcherError> {
        let sender = self.sender.load_full().ok_or(DispatcherError::Closing)?;
        sender
            .send(payload)
            .await
            .map_err(|_| DispatcherError::WorkerStopped)
    }

    /// Stop accepting payloads. Returns false if already sealed.
    pub(crate) fn seal(&self) -> bool {
        self.sender.swap(None).is_some()
    }

    /// Whether `seal` has been called
    pub(crate) fn is_sealed(&self) -> bool {
        self.sender.load().is_none()
    }

    /// Maximum number of queued payloads
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}
