//! Dispatcher error types

use std::sync::Arc;

use contracts::WriteMode;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Write attempted after `close()` began
    #[error("cannot write: dispatcher is closing")]
    Closing,

    /// A destination's write call failed
    #[error("destination '{destination}' (position {position}) write failed: {source}")]
    DestinationWrite {
        destination: String,
        position: usize,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A destination accepted fewer bytes than it was given
    #[error(
        "incomplete write to destination '{destination}' (position {position}): {written} of {expected} bytes"
    )]
    ShortWrite {
        destination: String,
        position: usize,
        written: usize,
        expected: usize,
    },

    /// The delivery worker exited before draining the queue
    #[error("delivery worker stopped unexpectedly")]
    WorkerStopped,

    /// Constructed outside a tokio runtime
    #[error("dispatcher requires a running tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Destination creation error
    #[error("failed to create destination '{name}': {message}")]
    DestinationCreation { name: String, message: String },

    /// Configuration error (from contract)
    #[error("config error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a destination write error
    pub fn destination_write(
        destination: impl Into<String>,
        position: usize,
        source: std::io::Error,
    ) -> Self {
        Self::DestinationWrite {
            destination: destination.into(),
            position,
            source: Arc::new(source),
        }
    }

    /// Create a short write error
    pub fn short_write(
        destination: impl Into<String>,
        position: usize,
        written: usize,
        expected: usize,
    ) -> Self {
        Self::ShortWrite {
            destination: destination.into(),
            position,
            written,
            expected,
        }
    }

    /// Create a destination creation error
    pub fn destination_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Name of the destination that failed a delivery pass, if any
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::DestinationWrite { destination, .. } | Self::ShortWrite { destination, .. } => {
                Some(destination)
            }
            _ => None,
        }
    }

    /// Whether this error is a short write
    pub fn is_short_write(&self) -> bool {
        matches!(self, Self::ShortWrite { .. })
    }

    /// The destination's own io error, for `DestinationWrite`
    pub fn io_source(&self) -> Option<&Arc<std::io::Error>> {
        match self {
            Self::DestinationWrite { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Copy of a delivery-pass error for failure subscribers.
    ///
    /// The io source is shared with the original, not rebuilt. `None` for
    /// errors that do not come from a pass.
    pub(crate) fn share_delivery(&self) -> Option<Self> {
        match self {
            Self::DestinationWrite {
                destination,
                position,
                source,
            } => Some(Self::DestinationWrite {
                destination: destination.clone(),
                position: *position,
                source: Arc::clone(source),
            }),
            Self::ShortWrite {
                destination,
                position,
                written,
                expected,
            } => Some(Self::short_write(
                destination.clone(),
                *position,
                *written,
                *expected,
            )),
            _ => None,
        }
    }
}

/// A failed delivery pass, published to failure subscribers.
///
/// Buffered passes have no caller to return an error to, so every failure
/// is broadcast through [`crate::Dispatcher::subscribe_failures`].
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    /// Mode of the write whose pass failed
    pub mode: WriteMode,
    /// Size of the payload that was being delivered
    pub payload_len: usize,
    /// The first destination error of the pass
    pub error: Arc<DispatcherError>,
}
