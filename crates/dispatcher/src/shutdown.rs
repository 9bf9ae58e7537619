//! Shutdown coordination: lifecycle state and the one-shot drain signal

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::DispatcherError;

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Accepting writes
    Open,
    /// `close()` requested; writes are rejected while the queue drains
    Closing,
    /// Queue fully drained
    Closed,
}

/// Tracks `Open -> Closing -> Closed` and lets any number of callers wait
/// for the drain.
pub(crate) struct ShutdownCoordinator {
    state: AtomicU8,
    drained: watch::Receiver<bool>,
}

/// Fired by the delivery worker once the queue has drained.
///
/// Dropping it without firing (worker panic) wakes waiters with an error.
pub(crate) struct DrainSignal {
    coordinator: Arc<ShutdownCoordinator>,
    tx: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub(crate) fn new() -> (Arc<Self>, DrainSignal) {
        let (tx, drained) = watch::channel(false);
        let coordinator = Arc::new(Self {
            state: AtomicU8::new(OPEN),
            drained,
        });
        let signal = DrainSignal {
            coordinator: Arc::clone(&coordinator),
            tx,
        };
        (coordinator, signal)
    }

    pub(crate) fn state(&self) -> Lifecycle {
        match self.state.load(Ordering::Acquire) {
            OPEN => Lifecycle::Open,
            CLOSING => Lifecycle::Closing,
            _ => Lifecycle::Closed,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OPEN
    }

    /// Move `Open -> Closing`. Only the first caller gets `true`.
    pub(crate) fn begin_closing(&self) -> bool {
        self.state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Wait until the worker reports the queue drained
    pub(crate) async fn wait_drained(&self) -> Result<(), DispatcherError> {
        let mut drained = self.drained.clone();
        drained
            .wait_for(|done| *done)
            .await
            .map(|_| ())
            .map_err(|_| DispatcherError::WorkerStopped)
    }
}

impl DrainSignal {
    pub(crate) fn fire(self) {
        self.coordinator.state.store(CLOSED, Ordering::Release);
        self.tx.send_replace(true);
    }
}
