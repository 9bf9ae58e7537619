//! Destination trait - Dispatcher output interface
//!
//! Defines the byte-sink contract every fan-out target satisfies.

use async_trait::async_trait;

/// Byte sink that the dispatcher fans payloads out to.
///
/// Implementations only need to accept bytes. Buffering, flushing and
/// closing are the destination's own concern; the dispatcher never calls
/// anything but [`Destination::write`].
#[async_trait]
pub trait Destination: Send {
    /// Destination name (used for logging/errors)
    fn name(&self) -> &str;

    /// Write a payload, returning how many bytes were accepted.
    ///
    /// Returning fewer bytes than `buf.len()` is treated as a short write
    /// and aborts the current delivery pass.
    async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize>;
}
