//! Per-stream flush accounting
//!
//! Tracks how many flush jobs are outstanding for each stream (dispatched and
//! not yet finished) and which streams a worker is executing right now.

use dashmap::DashMap;
use spool_buffer::StreamDescriptor;

/// In-flight and in-progress counters keyed by stream
#[derive(Debug, Default)]
pub struct InFlight {
    /// Jobs dispatched and not yet finished
    outstanding: DashMap<StreamDescriptor, u64>,
    /// Jobs currently executing on a worker
    executing: DashMap<StreamDescriptor, u64>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding flush jobs for `stream`
    pub fn count(&self, stream: &StreamDescriptor) -> u64 {
        self.outstanding.get(stream).map(|c| *c).unwrap_or(0)
    }

    /// Outstanding flush jobs across all streams
    pub fn total(&self) -> u64 {
        self.outstanding.iter().map(|entry| *entry.value()).sum()
    }

    pub fn increment(&self, stream: &StreamDescriptor) {
        *self.outstanding.entry(stream.clone()).or_insert(0) += 1;
    }

    /// Decrement, clamping at zero
    ///
    /// Returns `false` when the counter was already zero. That is a
    /// bookkeeping defect; it is logged and otherwise ignored.
    pub fn decrement(&self, stream: &StreamDescriptor) -> bool {
        let decremented = match self.outstanding.get_mut(stream) {
            Some(mut count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        };

        if !decremented {
            tracing::warn!(
                stream = %stream,
                "in-flight counter would go negative, clamped to zero"
            );
        }

        decremented
    }

    pub fn mark_in_progress(&self, stream: &StreamDescriptor) {
        *self.executing.entry(stream.clone()).or_insert(0) += 1;
    }

    pub fn clear_in_progress(&self, stream: &StreamDescriptor) {
        if let Some(mut count) = self.executing.get_mut(stream) {
            *count = count.saturating_sub(1);
        }
        self.executing.remove_if(stream, |_, count| *count == 0);
    }

    /// Streams a worker is executing right now, sorted
    pub fn in_progress(&self) -> Vec<StreamDescriptor> {
        let mut streams: Vec<_> = self
            .executing
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        streams.sort();
        streams
    }
}
