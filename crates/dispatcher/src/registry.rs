//! Destination registry - copy-on-write list of fan-out targets
//!
//! Readers load an immutable snapshot without locking; registration swaps
//! in a new list that is the previous one plus the appended destination.

use std::sync::Arc;

use arc_swap::ArcSwap;
use contracts::Destination;
use tokio::sync::Mutex;

/// A registered destination.
///
/// The per-destination mutex only hands out `&mut` access; passes are
/// already serialized by the delivery lock, so it is never contended.
pub type DestinationSlot = Arc<Mutex<Box<dyn Destination>>>;

/// Ordered, append-only set of destinations
pub struct DestinationRegistry {
    entries: ArcSwap<Vec<DestinationSlot>>,
}

impl DestinationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append a destination and return its position
    pub fn register(&self, destination: Box<dyn Destination>) -> usize {
        let slot: DestinationSlot = Arc::new(Mutex::new(destination));
        let previous = self.entries.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&slot));
            next
        });
        previous.len()
    }

    /// Current ordered list of destinations
    pub fn snapshot(&self) -> Arc<Vec<DestinationSlot>> {
        self.entries.load_full()
    }

    /// Number of registered destinations
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Whether no destination has been registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DestinationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
