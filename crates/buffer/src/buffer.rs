//! StreamBuffer - bounded multi-stream buffer
//!
//! Producers `enqueue` into per-stream queues; flush workers `take` batches
//! from the head. Both bounds are enforced exactly, atomically with the push
//! that they gate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant as StdInstant;

use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::{BufferError, Result};
use crate::queue::StreamQueue;
use crate::{Batch, Record, StreamDescriptor};

/// Default global bound across all streams (1 GiB)
const DEFAULT_MAX_GLOBAL_BYTES: u64 = 1024 * 1024 * 1024;

/// Default per-stream bound (256 MiB)
const DEFAULT_MAX_STREAM_BYTES: u64 = 256 * 1024 * 1024;

/// Memory bounds for a `StreamBuffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLimits {
    /// Maximum bytes queued across all streams
    pub max_global_bytes: u64,
    /// Maximum bytes queued for a single stream
    pub max_stream_bytes: u64,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            max_global_bytes: DEFAULT_MAX_GLOBAL_BYTES,
            max_stream_bytes: DEFAULT_MAX_STREAM_BYTES,
        }
    }
}

impl BufferLimits {
    /// Create limits with explicit bounds
    pub fn new(max_global_bytes: u64, max_stream_bytes: u64) -> Self {
        Self {
            max_global_bytes,
            max_stream_bytes,
        }
    }
}

/// Point-in-time view of buffer occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferSnapshot {
    /// Bytes queued across all streams
    pub total_bytes: u64,
    /// Records queued across all streams
    pub total_records: u64,
    /// Streams seen so far
    pub stream_count: usize,
    /// Bytes taken into batches that have not been released yet
    pub batched_bytes: u64,
    /// Enqueue calls that had to wait for space
    pub blocked_enqueues: u64,
}

/// Global byte accounting shared by the buffer and live batches
///
/// `queued_bytes` always equals the sum of all per-stream queue totals: every
/// push and take adjusts it by exactly the bytes it moved.
#[derive(Debug)]
pub(crate) struct Accounting {
    max_global_bytes: u64,
    queued_bytes: AtomicU64,
    queued_records: AtomicU64,
    batched_bytes: AtomicU64,
    blocked_enqueues: AtomicU64,
    global_waiters: AtomicU64,
    closed: AtomicBool,
    space_freed: Notify,
}

impl Accounting {
    fn new(max_global_bytes: u64) -> Self {
        Self {
            max_global_bytes,
            queued_bytes: AtomicU64::new(0),
            queued_records: AtomicU64::new(0),
            batched_bytes: AtomicU64::new(0),
            blocked_enqueues: AtomicU64::new(0),
            global_waiters: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            space_freed: Notify::new(),
        }
    }

    /// Reserve `size` bytes against the global bound
    ///
    /// A record larger than the bound is admitted only into an empty buffer.
    fn try_reserve(&self, size: u64) -> bool {
        let mut current = self.queued_bytes.load(Ordering::Acquire);
        loop {
            if current > 0 && current.saturating_add(size) > self.max_global_bytes {
                return false;
            }
            match self.queued_bytes.compare_exchange_weak(
                current,
                current + size,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn release_batch(&self, size: u64) {
        self.batched_bytes.fetch_sub(size, Ordering::AcqRel);
    }
}

/// The bound that refused a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Stream,
    Global,
}

enum Refused {
    Closed,
    Full { record: Record, bound: Bound },
}

impl Refused {
    fn into_error(self, stream: &StreamDescriptor) -> BufferError {
        match self {
            Self::Closed => BufferError::Closed,
            Self::Full { record, .. } => BufferError::Full {
                stream: stream.clone(),
                record,
            },
        }
    }
}

/// Counts a producer as waiting on one bound until dropped
struct Waiting<'a> {
    counter: &'a AtomicU64,
}

impl<'a> Waiting<'a> {
    fn new(counter: &'a AtomicU64) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }

    fn is_on(&self, counter: &AtomicU64) -> bool {
        std::ptr::eq(self.counter, counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Bounded multi-stream record buffer
///
/// # Thread Safety
///
/// All methods take `&self` and are safe to call concurrently. Share the
/// buffer with `Arc<StreamBuffer>`.
#[derive(Debug)]
pub struct StreamBuffer {
    queues: DashMap<StreamDescriptor, Arc<StreamQueue>>,
    accounting: Arc<Accounting>,
    limits: BufferLimits,
}

impl StreamBuffer {
    /// Create an empty buffer with the given bounds
    pub fn new(limits: BufferLimits) -> Self {
        Self {
            queues: DashMap::new(),
            accounting: Arc::new(Accounting::new(limits.max_global_bytes)),
            limits,
        }
    }

    /// Configured bounds
    #[inline]
    pub fn limits(&self) -> BufferLimits {
        self.limits
    }

    /// Append a record to the stream's tail, waiting for space if a bound
    /// would be exceeded
    ///
    /// Resumes automatically once a `take` frees enough bytes. Returns
    /// `BufferError::Closed` if the buffer is closed while waiting.
    ///
    /// While parked, the producer is visible through `is_backpressured` or
    /// `stream_backpressured`, depending on which bound refused it.
    pub async fn enqueue(&self, stream: &StreamDescriptor, record: Record) -> Result<()> {
        let queue = self.queue_for(stream);
        let mut record = record;
        let mut waiting: Option<Waiting<'_>> = None;

        loop {
            // Register interest before checking so a concurrent take cannot
            // slip its notification in between the check and the await.
            let notified = self.accounting.space_freed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let bound = match self.push(&queue, record) {
                Ok(()) => return Ok(()),
                Err(Refused::Full {
                    record: rejected,
                    bound,
                }) => {
                    record = rejected;
                    bound
                }
                Err(refused) => return Err(refused.into_error(stream)),
            };

            let counter = match bound {
                Bound::Stream => &queue.waiters,
                Bound::Global => &self.accounting.global_waiters,
            };
            if !waiting.as_ref().is_some_and(|w| w.is_on(counter)) {
                if waiting.is_none() {
                    self.accounting
                        .blocked_enqueues
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        stream = %stream,
                        bound = ?bound,
                        record_bytes = record.size_bytes(),
                        stream_bytes = queue.size_bytes(),
                        global_bytes = self.total_size_bytes(),
                        "buffer full, waiting for flush"
                    );
                }
                waiting = Some(Waiting::new(counter));
            }

            notified.await;
        }
    }

    /// Append a record without waiting
    ///
    /// Returns `BufferError::Full` with the record if a bound would be
    /// exceeded.
    pub fn try_enqueue(&self, stream: &StreamDescriptor, record: Record) -> Result<()> {
        let queue = self.queue_for(stream);
        self.push(&queue, record)
            .map_err(|refused| refused.into_error(stream))
    }

    fn push(&self, queue: &StreamQueue, record: Record) -> std::result::Result<(), Refused> {
        if self.is_closed() {
            return Err(Refused::Closed);
        }

        let size = record.size_bytes();
        let mut state = queue.lock();

        if state.bytes > 0 && state.bytes.saturating_add(size) > self.limits.max_stream_bytes {
            return Err(Refused::Full {
                record,
                bound: Bound::Stream,
            });
        }

        if !self.accounting.try_reserve(size) {
            return Err(Refused::Full {
                record,
                bound: Bound::Global,
            });
        }

        state.push(record, Instant::now());
        queue.publish(&state);
        self.accounting
            .queued_records
            .fetch_add(1, Ordering::AcqRel);

        Ok(())
    }

    /// Remove the longest head prefix of `stream` whose size fits in
    /// `max_bytes`
    ///
    /// A non-empty queue always yields at least one record, even if that
    /// record alone exceeds `max_bytes`. Unknown or empty streams yield an
    /// empty batch. Never blocks on space.
    pub fn take(&self, stream: &StreamDescriptor, max_bytes: u64) -> Batch {
        let Some(queue) = self.queue(stream) else {
            return Batch::empty(stream.clone());
        };

        let start = StdInstant::now();
        let (records, bytes) = {
            let mut state = queue.lock();
            let (records, bytes) = state.drain_prefix(max_bytes);
            queue.publish(&state);
            if !records.is_empty() {
                self.accounting
                    .batched_bytes
                    .fetch_add(bytes, Ordering::AcqRel);
                self.accounting
                    .queued_bytes
                    .fetch_sub(bytes, Ordering::AcqRel);
                self.accounting
                    .queued_records
                    .fetch_sub(records.len() as u64, Ordering::AcqRel);
            }
            (records, bytes)
        };

        if records.is_empty() {
            return Batch::empty(stream.clone());
        }

        self.accounting.space_freed.notify_waiters();

        tracing::debug!(
            stream = %stream,
            records = records.len(),
            bytes,
            remaining_bytes = queue.size_bytes(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "took batch from queue"
        );

        Batch::new(stream.clone(), records, bytes, Arc::clone(&self.accounting))
    }

    /// Bytes queued for `stream` (0 for unknown streams)
    pub fn queue_size_bytes(&self, stream: &StreamDescriptor) -> u64 {
        self.queue(stream).map_or(0, |q| q.size_bytes())
    }

    /// Records queued for `stream` (0 for unknown streams)
    pub fn queue_size_records(&self, stream: &StreamDescriptor) -> u64 {
        self.queue(stream).map_or(0, |q| q.size_records())
    }

    /// Bytes queued across all streams
    #[inline]
    pub fn total_size_bytes(&self) -> u64 {
        self.accounting.queued_bytes.load(Ordering::Acquire)
    }

    /// Records queued across all streams
    #[inline]
    pub fn total_size_records(&self) -> u64 {
        self.accounting.queued_records.load(Ordering::Acquire)
    }

    /// Bytes held by batches that have not been dropped yet
    #[inline]
    pub fn batched_bytes(&self) -> u64 {
        self.accounting.batched_bytes.load(Ordering::Acquire)
    }

    /// True while at least one producer is parked on the global bound
    ///
    /// The buffer can refuse a record while still holding less than
    /// `max_global_bytes`, so this is the signal that it is effectively full.
    #[inline]
    pub fn is_backpressured(&self) -> bool {
        self.accounting.global_waiters.load(Ordering::Acquire) > 0
    }

    /// True while at least one producer is parked on `stream`'s own bound
    pub fn stream_backpressured(&self, stream: &StreamDescriptor) -> bool {
        self.queue(stream)
            .is_some_and(|q| q.waiters.load(Ordering::Acquire) > 0)
    }

    /// Arrival time of the most recently enqueued record for `stream`
    pub fn time_of_last_record(&self, stream: &StreamDescriptor) -> Option<Instant> {
        self.queue(stream).and_then(|q| q.last_record_at())
    }

    /// Streams seen so far, in no particular order
    pub fn streams(&self) -> Vec<StreamDescriptor> {
        self.queues.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of streams seen so far
    pub fn stream_count(&self) -> usize {
        self.queues.len()
    }

    /// Stop accepting records and wake every waiting producer with
    /// `BufferError::Closed`
    ///
    /// Already queued records stay available to `take`.
    pub fn close(&self) {
        if !self.accounting.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(
                queued_bytes = self.total_size_bytes(),
                streams = self.stream_count(),
                "buffer closed to new records"
            );
        }
        self.accounting.space_freed.notify_waiters();
    }

    /// Check if the buffer has been closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.accounting.closed.load(Ordering::Acquire)
    }

    /// Point-in-time occupancy snapshot
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            total_bytes: self.total_size_bytes(),
            total_records: self.total_size_records(),
            stream_count: self.stream_count(),
            batched_bytes: self.batched_bytes(),
            blocked_enqueues: self.accounting.blocked_enqueues.load(Ordering::Relaxed),
        }
    }

    fn queue(&self, stream: &StreamDescriptor) -> Option<Arc<StreamQueue>> {
        self.queues.get(stream).map(|entry| Arc::clone(entry.value()))
    }

    /// Get or lazily create the stream's queue
    fn queue_for(&self, stream: &StreamDescriptor) -> Arc<StreamQueue> {
        if let Some(queue) = self.queue(stream) {
            return queue;
        }
        let queue = self
            .queues
            .entry(stream.clone())
            .or_insert_with(|| {
                tracing::debug!(stream = %stream, "created queue for new stream");
                Arc::new(StreamQueue::new())
            });
        Arc::clone(queue.value())
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new(BufferLimits::default())
    }
}
