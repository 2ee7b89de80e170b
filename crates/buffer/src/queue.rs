//! Per-stream FIFO queue

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::Record;

/// FIFO queue for one stream
///
/// Mutations happen under `state`; `bytes` and `records` mirror the locked
/// totals so observers can read them without taking the lock.
#[derive(Debug, Default)]
pub(crate) struct StreamQueue {
    state: Mutex<QueueState>,
    bytes: AtomicU64,
    records: AtomicU64,
    /// Producers parked on this stream's bound
    pub(crate) waiters: AtomicU64,
}

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    pub(crate) records: VecDeque<Record>,
    pub(crate) bytes: u64,
    pub(crate) last_record_at: Option<Instant>,
}

impl StreamQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock()
    }

    /// Publish the locked totals to the lock-free mirrors
    ///
    /// Must be called while holding the guard that mutated `state`.
    #[inline]
    pub(crate) fn publish(&self, state: &QueueState) {
        self.bytes.store(state.bytes, Ordering::Release);
        self.records
            .store(state.records.len() as u64, Ordering::Release);
    }

    #[inline]
    pub(crate) fn size_bytes(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn size_records(&self) -> u64 {
        self.records.load(Ordering::Acquire)
    }

    pub(crate) fn last_record_at(&self) -> Option<Instant> {
        self.state.lock().last_record_at
    }
}

impl QueueState {
    /// Append a record and stamp the arrival time
    pub(crate) fn push(&mut self, record: Record, now: Instant) {
        self.bytes += record.size_bytes();
        self.records.push_back(record);
        self.last_record_at = Some(now);
    }

    /// Remove the longest head prefix fitting in `max_bytes`
    ///
    /// The first record is always taken, even if it alone exceeds `max_bytes`.
    pub(crate) fn drain_prefix(&mut self, max_bytes: u64) -> (Vec<Record>, u64) {
        let mut taken = Vec::new();
        let mut taken_bytes = 0u64;

        while let Some(size) = self.records.front().map(Record::size_bytes) {
            if !taken.is_empty() && taken_bytes.saturating_add(size) > max_bytes {
                break;
            }
            let Some(record) = self.records.pop_front() else {
                break;
            };
            taken_bytes += size;
            taken.push(record);
        }

        self.bytes -= taken_bytes;
        (taken, taken_bytes)
    }
}
