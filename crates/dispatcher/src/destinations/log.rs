//! LogDestination - emits payloads via tracing

use async_trait::async_trait;
use contracts::Destination;
use tracing::{info, instrument};

/// Destination that turns every payload into a tracing event
pub struct LogDestination {
    name: String,
}

impl LogDestination {
    /// Create a new LogDestination with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_payload(&self, buf: &[u8]) {
        let text = String::from_utf8_lossy(buf);
        info!(
            destination = %self.name,
            bytes = buf.len(),
            payload = %text.trim_end(),
            "Payload received"
        );
    }
}

#[async_trait]
impl Destination for LogDestination {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_destination_write",
        skip(self, buf),
        fields(destination = %self.name, bytes = buf.len())
    )]
    async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.log_payload(buf);
        Ok(buf.len())
    }
}
