//! Per-group operation counters
//!
//! - Counters only, monotonic
//! - Relaxed atomics; counters are updated outside the group lock

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for one record group.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Indexes registered
    indexes_registered: AtomicU64,
    /// Group insert-or-replace calls with a record
    writes: AtomicU64,
    /// Group delete calls with a record
    deletes: AtomicU64,
    /// Index entries removed by deletes
    keys_removed: AtomicU64,
    /// Point reads (get/has) through index handles
    lookups: AtomicU64,
    /// Materialized traversals through index handles
    traversals: AtomicU64,
    /// Poisoned lock acquisitions recovered
    lock_poisonings: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_indexes(&self) {
        self.indexes_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delete that removed `keys` index entries
    pub fn record_delete(&self, keys: usize) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.keys_removed.fetch_add(keys as u64, Ordering::Relaxed);
    }

    pub fn increment_lookups(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_traversals(&self) {
        self.traversals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_lock_poisonings(&self) {
        self.lock_poisonings.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            indexes_registered: self.indexes_registered.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            keys_removed: self.keys_removed.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            traversals: self.traversals.load(Ordering::Relaxed),
            lock_poisonings: self.lock_poisonings.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of a group's counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub indexes_registered: u64,
    pub writes: u64,
    pub deletes: u64,
    pub keys_removed: u64,
    pub lookups: u64,
    pub traversals: u64,
    pub lock_poisonings: u64,
}

impl MetricsSnapshot {
    /// Render as a single-line JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
