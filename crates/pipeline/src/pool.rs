//! Worker pool - concurrent flush execution
//!
//! A fixed number of worker tasks pull [`FlushJob`]s from one unbounded queue.
//! Each job takes up to the writer's optimal batch size from the buffer and
//! hands it to the writer.
//!
//! # Design
//!
//! - Submission never blocks (unbounded `mpsc`, receiver shared by workers)
//! - Every submitted job counts as in flight for its stream until it finishes
//! - The writer call runs in its own task so a panic is caught and reported
//!   instead of killing the worker
//! - Failed batches are published on the failure channel, never retried

use crate::error::{FlushError, FlushFailure, Result};
use crate::in_flight::InFlight;
use crate::metrics::FlushMetrics;
use crate::writer::Writer;
use spool_buffer::{StreamBuffer, StreamDescriptor};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::{Notify, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;

/// Why a flush was dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Pending bytes reached the per-stream threshold
    Size,
    /// Last record is older than the staleness bound
    Stale,
    /// The buffer hit its global bound
    GlobalRelief,
    /// Drain at shutdown
    Shutdown,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Stale => "stale",
            Self::GlobalRelief => "global_relief",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work: flush up to one batch of `stream`
#[derive(Debug, Clone)]
pub struct FlushJob {
    pub stream: StreamDescriptor,
    pub reason: FlushReason,
}

/// State shared by the pool handle and its workers
struct Shared<W> {
    buffer: Arc<StreamBuffer>,
    writer: Arc<W>,
    in_flight: Arc<InFlight>,
    metrics: Arc<FlushMetrics>,
    failures: mpsc::UnboundedSender<FlushFailure>,
    queue_depth: AtomicUsize,
    active: AtomicUsize,
    /// Signalled whenever a job finishes
    job_done: Notify,
}

/// Fixed-size pool of flush workers
pub struct WorkerPool<W: Writer> {
    shared: Arc<Shared<W>>,
    sender: parking_lot::Mutex<Option<mpsc::UnboundedSender<FlushJob>>>,
    handles: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl<W: Writer> WorkerPool<W> {
    /// Spawn `size` workers on the current runtime
    ///
    /// Returns the pool and the receiving end of its failure channel.
    pub fn spawn(
        size: usize,
        buffer: Arc<StreamBuffer>,
        writer: Arc<W>,
        in_flight: Arc<InFlight>,
        metrics: Arc<FlushMetrics>,
    ) -> (Self, mpsc::UnboundedReceiver<FlushFailure>) {
        let size = size.max(1);
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));

        let shared = Arc::new(Shared {
            buffer,
            writer,
            in_flight,
            metrics,
            failures: failure_tx,
            queue_depth: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            job_done: Notify::new(),
        });

        let handles = (0..size)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                let job_rx = Arc::clone(&job_rx);
                tokio::spawn(worker_loop(worker_id, shared, job_rx))
            })
            .collect();

        debug!(workers = size, writer = shared.writer.name(), "worker pool started");

        let pool = Self {
            shared,
            sender: parking_lot::Mutex::new(Some(job_tx)),
            handles: parking_lot::Mutex::new(handles),
            size,
        };

        (pool, failure_rx)
    }

    /// Queue a flush of `stream`
    ///
    /// Never blocks. The stream's in-flight counter is incremented here and
    /// decremented by the worker when the job finishes.
    pub fn submit(&self, stream: StreamDescriptor, reason: FlushReason) -> Result<()> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(FlushError::ShuttingDown);
        };

        debug!(stream = %stream, reason = %reason, "flush dispatched");
        self.shared.in_flight.increment(&stream);
        self.shared.queue_depth.fetch_add(1, Ordering::Relaxed);

        if let Err(mpsc::error::SendError(job)) = sender.send(FlushJob { stream, reason }) {
            self.shared.queue_depth.fetch_sub(1, Ordering::Relaxed);
            self.shared.in_flight.decrement(&job.stream);
            return Err(FlushError::ShuttingDown);
        }

        self.shared.metrics.record_dispatched();
        Ok(())
    }

    /// Stop accepting jobs; workers exit once the queue is empty
    pub fn close(&self) {
        if self.sender.lock().take().is_some() {
            debug!("worker pool closed to new jobs");
        }
    }

    /// Wait for every worker to exit
    ///
    /// Only returns after [`close`](Self::close); jobs already queued are
    /// executed first.
    pub async fn join(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "flush worker terminated abnormally");
            }
        }
    }

    /// Wait until no job is queued or executing
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.job_done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shared.in_flight.total() == 0 {
                return;
            }

            notified.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers currently executing a job
    pub fn active(&self) -> usize {
        self.shared.active.load(Ordering::Relaxed)
    }

    /// Jobs submitted and not yet picked up
    pub fn queue_depth(&self) -> usize {
        self.shared.queue_depth.load(Ordering::Relaxed)
    }

    pub fn writer(&self) -> &Arc<W> {
        &self.shared.writer
    }
}

async fn worker_loop<W: Writer>(
    worker_id: usize,
    shared: Arc<Shared<W>>,
    jobs: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<FlushJob>>>,
) {
    loop {
        // Lock only while waiting; released before the flush runs
        let job = jobs.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        shared.queue_depth.fetch_sub(1, Ordering::Relaxed);
        shared.run(job).await;
    }

    debug!(worker_id, "flush worker stopped");
}

impl<W: Writer> Shared<W> {
    async fn run(&self, job: FlushJob) {
        let FlushJob { stream, reason } = job;
        self.active.fetch_add(1, Ordering::Relaxed);
        self.in_flight.mark_in_progress(&stream);

        if let Err(failure) = self.flush(&stream, reason).await {
            self.metrics.record_failed();
            error!(
                stream = %failure.stream,
                records = failure.records,
                bytes = failure.bytes,
                error = %failure.error,
                "flush failed, batch dropped"
            );
            // Receiver gone means nobody is supervising; the error log stands
            let _ = self.failures.send(failure);
        }

        // Worker counts as free before the job stops counting as in flight
        self.in_flight.clear_in_progress(&stream);
        self.active.fetch_sub(1, Ordering::Relaxed);
        if !self.in_flight.decrement(&stream) {
            self.metrics.record_underflow();
        }
        self.job_done.notify_waiters();
    }

    async fn flush(
        &self,
        stream: &StreamDescriptor,
        reason: FlushReason,
    ) -> std::result::Result<(), FlushFailure> {
        let queued_records = self.buffer.queue_size_records(stream);
        let batch = self
            .buffer
            .take(stream, self.writer.optimal_batch_size_bytes());

        if batch.is_empty() {
            self.metrics.record_empty();
            debug!(stream = %stream, reason = %reason, "nothing to flush");
            return Ok(());
        }

        let records = batch.len();
        let bytes = batch.size_bytes();
        let started = Instant::now();

        // Batch moves into the task and is released when the task ends,
        // whether the writer succeeded, failed or panicked
        let writer = Arc::clone(&self.writer);
        let task_stream = stream.clone();
        let outcome = tokio::spawn(async move { writer.flush(&task_stream, &batch).await }).await;

        let error = match outcome {
            Ok(Ok(())) => {
                self.metrics.record_completed(records as u64, bytes);
                debug!(
                    stream = %stream,
                    reason = %reason,
                    records,
                    bytes,
                    queued_before = queued_records,
                    queued_after = self.buffer.queue_size_records(stream),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "flushed batch"
                );
                return Ok(());
            }
            Ok(Err(source)) => FlushError::Writer {
                stream: stream.clone(),
                source,
            },
            Err(join_error) => FlushError::Panicked {
                stream: stream.clone(),
                message: panic_message(join_error),
            },
        };

        Err(FlushFailure {
            stream: stream.clone(),
            records,
            bytes,
            error,
        })
    }
}

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }

    let payload = error.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
