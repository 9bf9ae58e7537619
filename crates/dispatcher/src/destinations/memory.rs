//! MemoryDestination - records payloads in memory

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use contracts::Destination;

/// In-memory destination that keeps every payload as a separate chunk.
///
/// Clones share storage: registering two clones of the same destination
/// records every payload twice.
#[derive(Debug, Clone)]
pub struct MemoryDestination {
    name: String,
    payloads: Arc<Mutex<Vec<Bytes>>>,
}

impl MemoryDestination {
    /// Create an empty MemoryDestination
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Payloads received so far, in delivery order
    pub fn payloads(&self) -> Vec<Bytes> {
        self.lock().clone()
    }

    /// All received bytes concatenated
    pub fn contents(&self) -> Vec<u8> {
        self.lock().concat()
    }

    /// Number of payloads received
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been received
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop everything recorded so far
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Bytes>> {
        self.payloads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.lock().push(Bytes::copy_from_slice(buf));
        Ok(buf.len())
    }
}
