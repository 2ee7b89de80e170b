//! Flush pipeline metrics
//!
//! Atomic counters for the scheduler and worker pool.
//! All operations use relaxed ordering; values are eventually consistent.

use spool_metrics::FlushSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the scheduler and workers
#[derive(Debug, Default)]
pub struct FlushMetrics {
    ticks: AtomicU64,
    global_relief_ticks: AtomicU64,
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    empty_batches: AtomicU64,
    records_flushed: AtomicU64,
    bytes_flushed: AtomicU64,
    in_flight_underflows: AtomicU64,
}

impl FlushMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            global_relief_ticks: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            empty_batches: AtomicU64::new(0),
            records_flushed: AtomicU64::new(0),
            bytes_flushed: AtomicU64::new(0),
            in_flight_underflows: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_global_relief(&self) {
        self.global_relief_ticks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch the writer accepted
    #[inline]
    pub fn record_completed(&self, records: u64, bytes: u64) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.records_flushed.fetch_add(records, Ordering::Relaxed);
        self.bytes_flushed.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job that found its stream already empty
    #[inline]
    pub fn record_empty(&self) {
        self.empty_batches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_underflow(&self) {
        self.in_flight_underflows.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    pub fn snapshot(&self) -> FlushSnapshot {
        FlushSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            global_relief_ticks: self.global_relief_ticks.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            empty_batches: self.empty_batches.load(Ordering::Relaxed),
            records_flushed: self.records_flushed.load(Ordering::Relaxed),
            bytes_flushed: self.bytes_flushed.load(Ordering::Relaxed),
            in_flight_underflows: self.in_flight_underflows.load(Ordering::Relaxed),
        }
    }

    /// Get failed flush count
    #[inline]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zero() {
        assert_eq!(FlushMetrics::new().snapshot(), FlushSnapshot::default());
    }

    #[test]
    fn test_record_and_snapshot() {
        let metrics = FlushMetrics::new();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_global_relief();
        metrics.record_dispatched();
        metrics.record_dispatched();
        metrics.record_completed(10, 500);
        metrics.record_failed();
        metrics.record_empty();
        metrics.record_underflow();

        let s = metrics.snapshot();
        assert_eq!(s.ticks, 2);
        assert_eq!(s.global_relief_ticks, 1);
        assert_eq!(s.dispatched, 2);
        assert_eq!(s.completed, 1);
        assert_eq!(s.records_flushed, 10);
        assert_eq!(s.bytes_flushed, 500);
        assert_eq!(s.failed, 1);
        assert_eq!(s.empty_batches, 1);
        assert_eq!(s.in_flight_underflows, 1);
        assert_eq!(metrics.failed(), 1);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = std::sync::Arc::new(FlushMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = std::sync::Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_completed(1, 2);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let s = metrics.snapshot();
        assert_eq!(s.completed, 4000);
        assert_eq!(s.bytes_flushed, 8000);
    }
}
