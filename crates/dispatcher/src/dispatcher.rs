//! Dispatcher - public write surface over the queue and the fan-out pass

use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    ContractError, Destination, DestinationConfig, DestinationKind, DispatcherConfig,
    FanoutBlueprint, WriteMode,
};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::destinations::{FileDestination, LogDestination, WriterDestination};
use crate::error::{DeliveryFailure, DispatcherError};
use crate::fanout::Fanout;
use crate::metrics::{DeliveryMetrics, MetricsSnapshot};
use crate::queue::DeliveryQueue;
use crate::shutdown::{Lifecycle, ShutdownCoordinator};
use crate::worker::DeliveryWorker;

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    destination_configs: Vec<DestinationConfig>,
    destinations: Vec<Box<dyn Destination>>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            destination_configs: Vec::new(),
            destinations: Vec::new(),
        }
    }

    /// Add a destination to be created from configuration
    pub fn destination_config(mut self, config: DestinationConfig) -> Self {
        self.destination_configs.push(config);
        self
    }

    /// Add an already constructed destination.
    ///
    /// Registered after every configured destination.
    pub fn destination(mut self, destination: impl Destination + 'static) -> Self {
        self.destinations.push(Box::new(destination));
        self
    }

    /// Create the destinations and start the dispatcher
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(destinations = self.destination_configs.len() + self.destinations.len())
    )]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut destinations = Vec::with_capacity(self.destination_configs.len());
        for config in &self.destination_configs {
            destinations.push(create_destination(config).await?);
        }
        destinations.extend(self.destinations);

        let dispatcher = Dispatcher::new(self.config)?;
        for destination in destinations {
            dispatcher.add_boxed_destination(destination);
        }
        Ok(dispatcher)
    }
}

/// Create a destination from configuration
#[instrument(
    name = "dispatcher_create_destination",
    skip(config),
    fields(destination = %config.name, kind = ?config.kind)
)]
pub async fn create_destination(
    config: &DestinationConfig,
) -> Result<Box<dyn Destination>, DispatcherError> {
    let destination: Box<dyn Destination> = match config.kind {
        DestinationKind::Log => Box::new(LogDestination::new(&config.name)),
        DestinationKind::File => Box::new(
            FileDestination::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::destination_creation(&config.name, e.to_string()))?,
        ),
        DestinationKind::Stdout => {
            Box::new(WriterDestination::new(&config.name, tokio::io::stdout()))
        }
        DestinationKind::Stderr => {
            Box::new(WriterDestination::new(&config.name, tokio::io::stderr()))
        }
    };
    Ok(destination)
}

/// Fans every write out to a growable set of destinations.
///
/// `Buffered` writes are copied onto a bounded queue and delivered by a
/// background worker; `Immediate` writes are delivered before the call
/// returns. Both paths share one delivery lock, so fan-out passes never
/// interleave.
pub struct Dispatcher {
    default_mode: WriteMode,
    fanout: Arc<Fanout>,
    queue: DeliveryQueue,
    shutdown: Arc<ShutdownCoordinator>,
    failures: broadcast::Sender<DeliveryFailure>,
    metrics: Arc<DeliveryMetrics>,
}

impl Dispatcher {
    /// Create a dispatcher with no destinations and spawn its worker.
    ///
    /// Fails with [`DispatcherError::NoRuntime`] outside a tokio runtime.
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatcherError> {
        let runtime = Handle::try_current()?;
        if config.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                "dispatcher.queue_capacity",
                "queue_capacity must be > 0",
            )
            .into());
        }
        if config.failure_channel_capacity == 0 {
            return Err(ContractError::config_validation(
                "dispatcher.failure_channel_capacity",
                "failure_channel_capacity must be > 0",
            )
            .into());
        }

        let metrics = Arc::new(DeliveryMetrics::new());
        let fanout = Arc::new(Fanout::new(Arc::clone(&metrics)));
        let (queue, rx) = DeliveryQueue::new(config.queue_capacity);
        let (shutdown, drain) = ShutdownCoordinator::new();
        let (failures, _) = broadcast::channel(config.failure_channel_capacity);

        DeliveryWorker {
            rx,
            fanout: Arc::clone(&fanout),
            metrics: Arc::clone(&metrics),
            failures: failures.clone(),
            drain,
        }
        .spawn(&runtime);

        info!(
            queue_capacity = config.queue_capacity,
            default_mode = %config.default_mode,
            "Dispatcher started"
        );

        Ok(Self {
            default_mode: config.default_mode,
            fanout,
            queue,
            shutdown,
            failures,
            metrics,
        })
    }

    /// Start a builder
    pub fn builder(config: DispatcherConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(config)
    }

    /// Mode used by [`Dispatcher::write`]
    pub fn default_mode(&self) -> WriteMode {
        self.default_mode
    }

    /// Current lifecycle state
    pub fn state(&self) -> Lifecycle {
        self.shutdown.state()
    }

    /// Capacity of the buffered queue
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Number of registered destinations
    pub fn destination_count(&self) -> usize {
        self.fanout.registry().len()
    }

    /// Get current metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Receive every failed delivery pass from now on.
    ///
    /// Buffered failures have no caller to return to; this is where they
    /// surface. Immediate failures are published too.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<DeliveryFailure> {
        self.failures.subscribe()
    }

    /// Register a destination.
    ///
    /// Takes effect for every pass that starts after this returns.
    pub fn add_destination(&self, destination: impl Destination + 'static) {
        self.add_boxed_destination(Box::new(destination));
    }

    /// Register an already boxed destination
    pub fn add_boxed_destination(&self, destination: Box<dyn Destination>) {
        let name = destination.name().to_string();
        let position = self.fanout.registry().register(destination);

        if self.shutdown.is_open() {
            debug!(destination = %name, position, "Destination registered");
        } else {
            warn!(
                destination = %name,
                position,
                state = ?self.state(),
                "Destination registered after close; it will receive nothing further"
            );
        }
    }

    /// Write using the default mode.
    ///
    /// Returns `buf.len()` once the payload is accepted.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, DispatcherError> {
        self.write_tagged(self.default_mode, buf).await
    }

    /// Write with an explicit mode.
    ///
    /// - `Buffered`: copies `buf` onto the queue, waiting while it is full.
    /// - `Immediate`: delivers to the current destinations and returns the
    ///   first destination error, if any.
    ///
    /// Both fail with [`DispatcherError::Closing`] once `close()` has begun.
    pub async fn write_tagged(&self, mode: WriteMode, buf: &[u8]) -> Result<usize, DispatcherError> {
        if !self.shutdown.is_open() {
            self.metrics.inc_rejected(mode);
            return Err(DispatcherError::Closing);
        }

        match mode {
            WriteMode::Buffered => {
                self.queue
                    .enqueue(Bytes::copy_from_slice(buf))
                    .await
                    .inspect_err(|e| {
                        if matches!(e, DispatcherError::Closing) {
                            self.metrics.inc_rejected(mode);
                        }
                    })?;
            }
            WriteMode::Immediate => {
                if let Err(e) = self.fanout.pass(mode, buf).await {
                    warn!(
                        destination = e.destination().unwrap_or_default(),
                        bytes = buf.len(),
                        error = %e,
                        "Immediate delivery failed"
                    );
                    if let Some(shared) = e.share_delivery() {
                        let _ = self.failures.send(DeliveryFailure {
                            mode,
                            payload_len: buf.len(),
                            error: Arc::new(shared),
                        });
                    }
                    return Err(e);
                }
            }
        }

        self.metrics.inc_accepted(mode, buf.len());
        Ok(buf.len())
    }

    /// Stop accepting writes and wait until every queued payload has been
    /// delivered.
    ///
    /// Safe to call more than once or concurrently: every call returns after
    /// the same drain.
    #[instrument(name = "dispatcher_close", skip(self))]
    pub async fn close(&self) -> Result<(), DispatcherError> {
        if self.shutdown.begin_closing() {
            self.queue.seal();
            info!(
                queued = self.metrics.queue_len(),
                "Dispatcher closing, draining queue"
            );
        } else {
            debug!(
                state = ?self.state(),
                sealed = self.queue.is_sealed(),
                "Close already requested"
            );
        }

        self.shutdown.wait_drained().await?;
        debug!("Dispatcher closed");
        Ok(())
    }
}

/// Convenience function to create a dispatcher from a blueprint
#[instrument(name = "dispatcher_create", skip(blueprint))]
pub async fn create_dispatcher(blueprint: &FanoutBlueprint) -> Result<Dispatcher, DispatcherError> {
    blueprint
        .destinations
        .iter()
        .cloned()
        .fold(
            DispatcherBuilder::new(blueprint.dispatcher.clone()),
            DispatcherBuilder::destination_config,
        )
        .build()
        .await
}
