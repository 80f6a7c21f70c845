//! FIB control-plane metrics.
//!
//! Counters for the events the FIB cares about: path lifecycle,
//! resolution, back-walk traffic, and convergence triggers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic event counter.
///
/// Relaxed ordering is enough here: readers only ever want a snapshot.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Count one event.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters for the FIB control plane.
#[derive(Debug, Default)]
pub struct FibMetrics {
    /// Paths created (including copies and specials).
    pub paths_created: Counter,
    /// Paths destroyed.
    pub paths_destroyed: Counter,
    /// Resolution attempts.
    pub path_resolves: Counter,
    /// Back-walk node visits.
    pub back_walks: Counter,
    /// Recursion cycles detected.
    pub recursive_loops: Counter,
    /// PIC-edge notifications sent to the load-balance maps.
    pub pic_edge_events: Counter,
}

impl FibMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports all metrics as key-value pairs.
    pub fn export(&self) -> Vec<(String, u64)> {
        vec![
            ("paths_created".into(), self.paths_created.get()),
            ("paths_destroyed".into(), self.paths_destroyed.get()),
            ("path_resolves".into(), self.path_resolves.get()),
            ("back_walks".into(), self.back_walks.get()),
            ("recursive_loops".into(), self.recursive_loops.get()),
            ("pic_edge_events".into(), self.pic_edge_events.get()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_counts() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);

        counter.inc();
        counter.inc();
        counter.inc();
        assert_eq!(counter.get(), 3);
    }

    #[test]
    fn test_metrics_export() {
        let metrics = FibMetrics::new();
        metrics.paths_created.inc();
        metrics.paths_created.inc();
        metrics.recursive_loops.inc();

        let exported = metrics.export();
        assert!(exported.contains(&("paths_created".into(), 2)));
        assert!(exported.contains(&("recursive_loops".into(), 1)));
        assert!(exported.contains(&("back_walks".into(), 0)));
    }
}
