//! Fan-out pass - one payload delivered across the registry snapshot

use std::sync::Arc;
use std::time::Instant;

use contracts::{Destination, WriteMode};
use tokio::sync::Mutex;
use tracing::{instrument, trace};

use crate::error::DispatcherError;
use crate::metrics::DeliveryMetrics;
use crate::registry::{DestinationRegistry, DestinationSlot};

/// Registry plus the delivery lock shared by the worker and immediate writers
pub(crate) struct Fanout {
    registry: DestinationRegistry,
    delivery_lock: Mutex<()>,
    metrics: Arc<DeliveryMetrics>,
}

impl Fanout {
    pub(crate) fn new(metrics: Arc<DeliveryMetrics>) -> Self {
        Self {
            registry: DestinationRegistry::new(),
            delivery_lock: Mutex::new(()),
            metrics,
        }
    }

    pub(crate) fn registry(&self) -> &DestinationRegistry {
        &self.registry
    }

    /// Deliver `payload` to every registered destination.
    ///
    /// Passes are serialized system-wide; the snapshot is taken after the
    /// lock is held. Returns the number of destinations reached.
    #[instrument(
        name = "fanout_pass",
        level = "debug",
        skip_all,
        fields(mode = %mode, bytes = payload.len())
    )]
    pub(crate) async fn pass(
        &self,
        mode: WriteMode,
        payload: &[u8],
    ) -> Result<usize, DispatcherError> {
        let _guard = self.delivery_lock.lock().await;
        let snapshot = self.registry.snapshot();
        let started = Instant::now();

        match deliver(&snapshot, payload).await {
            Ok(()) => {
                self.metrics.inc_pass_count();
                observability::record_pass_completed(
                    mode,
                    snapshot.len(),
                    started.elapsed().as_secs_f64() * 1_000_000.0,
                );
                Ok(snapshot.len())
            }
            Err(e) => {
                self.metrics.inc_failure_count(e.is_short_write());
                observability::record_pass_failed(
                    mode,
                    e.destination().unwrap_or_default(),
                    e.is_short_write(),
                );
                Err(e)
            }
        }
    }
}

/// Write to each destination in registration order, stopping at the first
/// error or short write.
async fn deliver(snapshot: &[DestinationSlot], payload: &[u8]) -> Result<(), DispatcherError> {
    for (position, slot) in snapshot.iter().enumerate() {
        let mut destination = slot.lock().await;
        match destination.write(payload).await {
            Ok(written) if written == payload.len() => {
                trace!(destination = destination.name(), position, "Payload delivered");
            }
            Ok(written) => {
                return Err(DispatcherError::short_write(
                    destination.name(),
                    position,
                    written,
                    payload.len(),
                ));
            }
            Err(e) => {
                return Err(DispatcherError::destination_write(
                    destination.name(),
                    position,
                    e,
                ));
            }
        }
    }
    Ok(())
}
