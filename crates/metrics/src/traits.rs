//! Report types and the provider trait
//!
//! The pipeline owns the live counters; these are the plain values it hands
//! out when asked.

use spool_buffer::{BufferSnapshot, StreamDescriptor};

/// Flush counters at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSnapshot {
    /// Scheduler ticks evaluated
    pub ticks: u64,
    /// Ticks that found the buffer at its global bound
    pub global_relief_ticks: u64,
    /// Flush jobs handed to the worker pool
    pub dispatched: u64,
    /// Flush jobs whose batch was written
    pub completed: u64,
    /// Flush jobs whose writer failed or panicked
    pub failed: u64,
    /// Flush jobs that found nothing to take
    pub empty_batches: u64,
    /// Records handed to the writer successfully
    pub records_flushed: u64,
    /// Bytes handed to the writer successfully
    pub bytes_flushed: u64,
    /// In-flight decrements that would have gone below zero
    pub in_flight_underflows: u64,
}

impl FlushSnapshot {
    /// Counter deltas since `previous`
    ///
    /// Saturates so a reset counter never reports a negative delta.
    pub fn diff(&self, previous: &FlushSnapshot) -> FlushSnapshot {
        FlushSnapshot {
            ticks: self.ticks.saturating_sub(previous.ticks),
            global_relief_ticks: self
                .global_relief_ticks
                .saturating_sub(previous.global_relief_ticks),
            dispatched: self.dispatched.saturating_sub(previous.dispatched),
            completed: self.completed.saturating_sub(previous.completed),
            failed: self.failed.saturating_sub(previous.failed),
            empty_batches: self.empty_batches.saturating_sub(previous.empty_batches),
            records_flushed: self.records_flushed.saturating_sub(previous.records_flushed),
            bytes_flushed: self.bytes_flushed.saturating_sub(previous.bytes_flushed),
            in_flight_underflows: self
                .in_flight_underflows
                .saturating_sub(previous.in_flight_underflows),
        }
    }
}

/// Worker pool state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerInfo {
    /// Configured number of workers
    pub pool_size: usize,
    /// Workers currently executing a flush
    pub active_workers: usize,
    /// Jobs waiting for a worker
    pub queue_depth: usize,
    /// Streams with at least one flush in flight
    pub in_progress: Vec<StreamDescriptor>,
}

/// Everything the reporter prints in one pass
#[derive(Debug, Clone, Default)]
pub struct FlushReport {
    pub workers: WorkerInfo,
    pub buffer: BufferSnapshot,
    pub flush: FlushSnapshot,
}

/// Source of flush reports
///
/// Implemented by the flush service; kept as a trait so the reporter can be
/// driven by a fixed report in tests.
pub trait FlushMetricsProvider: Send + Sync {
    /// Collect a report right now
    fn flush_report(&self) -> FlushReport;
}
