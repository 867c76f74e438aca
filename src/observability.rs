//! Run counters shared between fetch workers

use std::sync::atomic::{AtomicU64, Ordering};

/// Completion counters for one stitching run
#[derive(Debug, Default)]
pub struct FetchMetrics {
    tiles_fetched: AtomicU64,
    tiles_failed: AtomicU64,
    bytes_fetched: AtomicU64,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored tile; returns how many tiles are done so far.
    pub fn tile_fetched(&self, bytes: usize) -> u64 {
        self.bytes_fetched
            .fetch_add(bytes as u64, Ordering::Relaxed);
        let done = self.tiles_fetched.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(counter = "tiles_fetched", done, "Metric incremented");
        done
    }

    pub fn tile_failed(&self) {
        self.tiles_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "tiles_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tiles_fetched: self.tiles_fetched.load(Ordering::Relaxed),
            tiles_failed: self.tiles_failed.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub tiles_fetched: u64,
    pub tiles_failed: u64,
    pub bytes_fetched: u64,
}
