//! Coalescing statistics
//!
//! Counts how often callers were answered from the cached slot versus how
//! often the producer actually ran.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Per-cache counters tracked atomically
#[derive(Debug, Default)]
pub struct CoalescingStats {
    calls: AtomicU64,
    hits: AtomicU64,
    refreshes: AtomicU64,
    failed_refreshes: AtomicU64,
}

impl CoalescingStats {
    /// Create new statistics with all counters at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call answered from the cached slot
    pub(crate) fn record_hit(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a call that invoked the producer
    pub(crate) fn record_refresh(&self, failed: bool) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed_refreshes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Total calls
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Calls answered without running the producer
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Producer invocations
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Producer invocations that returned an error
    pub fn failed_refreshes(&self) -> u64 {
        self.failed_refreshes.load(Ordering::Relaxed)
    }

    /// Get snapshot of current statistics
    pub fn snapshot(&self) -> CoalescingStatsSnapshot {
        let calls = self.calls();
        let hits = self.hits();
        #[allow(clippy::cast_precision_loss)]
        let coalescing_ratio = if calls == 0 {
            0.0
        } else {
            hits as f64 / calls as f64
        };

        CoalescingStatsSnapshot {
            calls,
            hits,
            refreshes: self.refreshes(),
            failed_refreshes: self.failed_refreshes(),
            coalescing_ratio,
        }
    }
}

/// Snapshot of coalescing statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoalescingStatsSnapshot {
    /// Total calls
    pub calls: u64,
    /// Calls answered from the cached slot
    pub hits: u64,
    /// Producer invocations
    pub refreshes: u64,
    /// Producer invocations that returned an error
    pub failed_refreshes: u64,
    /// Share of calls answered from the cached slot (0.0-1.0)
    pub coalescing_ratio: f64,
}
