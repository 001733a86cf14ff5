//! Process-local counters for image export activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global export metrics using atomic counters.
///
/// All counters use relaxed ordering — they are approximate counters read
/// periodically, so strict ordering isn't needed.
pub struct ExportMetrics {
    /// Exports that reached the streaming phase.
    pub exports_started: AtomicU64,
    /// Exports whose archive was written to completion.
    pub exports_completed: AtomicU64,
    /// Exports that failed during archive construction or streaming.
    pub exports_failed: AtomicU64,
    /// Resolutions that matched no image in the namespace.
    pub lookups_not_found: AtomicU64,
}

impl Default for ExportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportMetrics {
    pub const fn new() -> Self {
        Self {
            exports_started: AtomicU64::new(0),
            exports_completed: AtomicU64::new(0),
            exports_failed: AtomicU64::new(0),
            lookups_not_found: AtomicU64::new(0),
        }
    }

    pub fn record_export_started(&self) {
        self.exports_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_export_completed(&self) {
        self.exports_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_export_failed(&self) {
        self.exports_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.lookups_not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters as key-value pairs for logging or reporting.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        vec![
            (
                "exports_started",
                self.exports_started.load(Ordering::Relaxed),
            ),
            (
                "exports_completed",
                self.exports_completed.load(Ordering::Relaxed),
            ),
            (
                "exports_failed",
                self.exports_failed.load(Ordering::Relaxed),
            ),
            (
                "lookups_not_found",
                self.lookups_not_found.load(Ordering::Relaxed),
            ),
        ]
    }
}

/// Global metrics instance.
static METRICS: ExportMetrics = ExportMetrics::new();

/// Returns the global metrics tracker.
pub fn metrics() -> &'static ExportMetrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_advance_and_snapshot() {
        let m = ExportMetrics::new();
        m.record_export_started();
        m.record_export_started();
        m.record_export_completed();
        m.record_export_failed();
        m.record_not_found();

        let snapshot: std::collections::HashMap<_, _> = m.snapshot().into_iter().collect();
        assert_eq!(snapshot["exports_started"], 2);
        assert_eq!(snapshot["exports_completed"], 1);
        assert_eq!(snapshot["exports_failed"], 1);
        assert_eq!(snapshot["lookups_not_found"], 1);
    }
}
