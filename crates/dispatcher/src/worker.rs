//! Delivery worker - sole consumer of the delivery queue

use std::sync::Arc;

use bytes::Bytes;
use contracts::WriteMode;
use tokio::sync::{broadcast, mpsc};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::error::{DeliveryFailure, DispatcherError};
use crate::fanout::Fanout;
use crate::metrics::DeliveryMetrics;
use crate::shutdown::DrainSignal;

/// State owned by the background delivery task
pub(crate) struct DeliveryWorker {
    pub(crate) rx: mpsc::Receiver<Bytes>,
    pub(crate) fanout: Arc<Fanout>,
    pub(crate) metrics: Arc<DeliveryMetrics>,
    pub(crate) failures: broadcast::Sender<DeliveryFailure>,
    pub(crate) drain: DrainSignal,
}

impl DeliveryWorker {
    /// Spawn the worker onto `runtime`
    pub(crate) fn spawn(self, runtime: &Handle) -> JoinHandle<()> {
        runtime.spawn(self.run())
    }

    /// Deliver payloads until every sender is gone and the queue is empty,
    /// then fire the drain signal.
    ///
    /// The worker is the only writer of the queue-depth gauge.
    #[instrument(name = "delivery_worker_loop", skip_all)]
    async fn run(mut self) {
        debug!("Delivery worker started");

        let mut delivered: u64 = 0;
        let mut failed: u64 = 0;

        while let Some(payload) = self.rx.recv().await {
            self.metrics.set_queue_len(self.rx.len());

            match self.fanout.pass(WriteMode::Buffered, &payload).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    self.report_failure(payload.len(), e);
                    // Keep going: a failing destination stays registered.
                }
            }
            self.metrics.set_queue_len(self.rx.len());
        }

        info!(delivered, failed, "Delivery queue drained");
        self.drain.fire();
    }

    fn report_failure(&self, payload_len: usize, e: DispatcherError) {
        error!(
            destination = e.destination().unwrap_or_default(),
            bytes = payload_len,
            error = %e,
            "Buffered delivery failed"
        );

        // No subscribers is fine: the failure is already logged and counted.
        let _ = self.failures.send(DeliveryFailure {
            mode: WriteMode::Buffered,
            payload_len,
            error: Arc::new(e),
        });
    }
}
