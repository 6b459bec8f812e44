//! Transfer engine counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Transfer engine metrics.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Transfers submitted to the engine.
    pub transfers_total: AtomicU64,
    /// Transfers committed.
    pub transfers_committed: AtomicU64,
    /// Transfers refused by a business rule.
    pub transfers_rejected: AtomicU64,
    /// Transfers that hit a storage failure or deadline.
    pub transfers_failed: AtomicU64,
    /// Units of work rolled back.
    pub rollbacks: AtomicU64,
    /// Rollbacks that themselves failed.
    pub rollback_failures: AtomicU64,
    /// Transfers in flight.
    pub transfers_active: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transfer entering the engine.
    ///
    /// The returned guard leaves the in-flight gauge when dropped. A guard
    /// dropped without an outcome, such as when the caller abandons the
    /// transfer, counts as a failure.
    pub fn transfer_started(&self) -> InFlight<'_> {
        self.transfers_total.fetch_add(1, Ordering::Relaxed);
        self.transfers_active.fetch_add(1, Ordering::Relaxed);
        InFlight {
            metrics: self,
            settled: false,
        }
    }

    /// Record a rollback and whether it succeeded.
    pub fn rolled_back(&self, succeeded: bool) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.rollback_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            transfers_total: self.transfers_total.load(Ordering::Relaxed),
            transfers_committed: self.transfers_committed.load(Ordering::Relaxed),
            transfers_rejected: self.transfers_rejected.load(Ordering::Relaxed),
            transfers_failed: self.transfers_failed.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            rollback_failures: self.rollback_failures.load(Ordering::Relaxed),
            transfers_active: self.transfers_active.load(Ordering::Relaxed),
        }
    }
}

/// A transfer counted in [`EngineMetrics::transfers_active`].
#[must_use = "dropping the guard immediately records a failed transfer"]
pub struct InFlight<'a> {
    metrics: &'a EngineMetrics,
    settled: bool,
}

impl InFlight<'_> {
    /// Record a committed transfer.
    pub fn committed(mut self) {
        self.metrics.transfers_committed.fetch_add(1, Ordering::Relaxed);
        self.settled = true;
    }

    /// Record a business-rule rejection.
    pub fn rejected(mut self) {
        self.metrics.transfers_rejected.fetch_add(1, Ordering::Relaxed);
        self.settled = true;
    }

    /// Record a storage or deadline failure.
    pub fn failed(self) {
        // Counted on drop.
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.metrics.transfers_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.metrics.transfers_active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub transfers_total: u64,
    pub transfers_committed: u64,
    pub transfers_rejected: u64,
    pub transfers_failed: u64,
    pub rollbacks: u64,
    pub rollback_failures: u64,
    pub transfers_active: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = EngineMetrics::new();

        let first = metrics.transfer_started();
        let second = metrics.transfer_started();
        let _third = metrics.transfer_started();
        first.committed();
        second.rejected();
        metrics.rolled_back(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.transfers_total, 3);
        assert_eq!(snapshot.transfers_committed, 1);
        assert_eq!(snapshot.transfers_rejected, 1);
        assert_eq!(snapshot.transfers_active, 1);
        assert_eq!(snapshot.rollbacks, 1);
        assert_eq!(snapshot.rollback_failures, 1);
    }

    #[test]
    fn test_unsettled_guard_counts_as_failure() {
        let metrics = EngineMetrics::new();

        metrics.transfer_started().failed();
        drop(metrics.transfer_started());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.transfers_total, 2);
        assert_eq!(snapshot.transfers_failed, 2);
        assert_eq!(snapshot.transfers_active, 0);
    }
}
