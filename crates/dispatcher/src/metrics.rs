//! Delivery metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::WriteMode;

/// Counters shared by the dispatcher front end and the delivery worker
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Buffered writes accepted onto the queue
    buffered_accepted: AtomicU64,
    /// Immediate writes accepted
    immediate_accepted: AtomicU64,
    /// Writes rejected because the dispatcher was closing
    rejected_count: AtomicU64,
    /// Passes that reached every destination
    pass_count: AtomicU64,
    /// Passes aborted by a destination error or short write
    failure_count: AtomicU64,
    /// Subset of failures caused by short writes
    short_write_count: AtomicU64,
}

impl DeliveryMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current queue length
    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    /// Set current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
        observability::record_queue_depth(len);
    }

    /// Record an accepted write
    pub fn inc_accepted(&self, mode: WriteMode, bytes: usize) {
        match mode {
            WriteMode::Buffered => self.buffered_accepted.fetch_add(1, Ordering::Relaxed),
            WriteMode::Immediate => self.immediate_accepted.fetch_add(1, Ordering::Relaxed),
        };
        observability::record_write_accepted(mode, bytes);
    }

    /// Record a write rejected by the lifecycle check
    pub fn inc_rejected(&self, mode: WriteMode) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
        observability::record_write_rejected(mode);
    }

    /// Record a completed pass
    pub fn inc_pass_count(&self) {
        self.pass_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an aborted pass
    pub fn inc_failure_count(&self, short_write: bool) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        if short_write {
            self.short_write_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            buffered_accepted: self.buffered_accepted.load(Ordering::Relaxed),
            immediate_accepted: self.immediate_accepted.load(Ordering::Relaxed),
            rejected_count: self.rejected_count.load(Ordering::Relaxed),
            pass_count: self.pass_count.load(Ordering::Relaxed),
            failure_count: self.failure_count(),
            short_write_count: self.short_write_count.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of delivery metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub buffered_accepted: u64,
    pub immediate_accepted: u64,
    pub rejected_count: u64,
    pub pass_count: u64,
    pub failure_count: u64,
    pub short_write_count: u64,
}
