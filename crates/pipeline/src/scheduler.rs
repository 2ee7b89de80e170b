//! Flush scheduler
//!
//! Runs on a fixed tick and decides which streams to flush:
//!
//! 1. When the buffer is at its global bound, or a producer is parked on it,
//!    every known stream is flushed and the tick ends there.
//! 2. Otherwise free worker capacity is read once and spent on streams whose
//!    pending bytes reached the threshold (or that have a producer parked on
//!    the stream bound), or whose last record is older than the staleness
//!    bound.
//!
//! Pending bytes are `queued - in_flight * optimal_batch_size`. That estimate
//! keeps a tick from re-dispatching backlog a worker is already draining; it
//! is approximate and may flush a little early or a tick late.
//!
//! Ticks never overlap: they run inside one task and a tick that falls behind
//! is skipped, not replayed.

use crate::in_flight::InFlight;
use crate::metrics::FlushMetrics;
use crate::pool::{FlushReason, WorkerPool};
use crate::writer::Writer;
use spool_buffer::{StreamBuffer, StreamDescriptor};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;

/// Scheduler tuning
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Pending bytes that make a stream due
    pub stream_threshold_bytes: u64,
    /// Age of the last record that makes a non-empty stream due
    pub staleness: Duration,
    /// Tick period
    pub tick_interval: Duration,
}

/// What a single tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The buffer was at its global bound or refusing producers
    pub global_relief: bool,
    /// Streams dispatched this tick, with the trigger
    pub dispatched: Vec<(StreamDescriptor, FlushReason)>,
    /// Due streams left for a later tick because no worker was free
    pub deferred: usize,
}

impl TickOutcome {
    pub fn dispatched_streams(&self) -> Vec<StreamDescriptor> {
        let mut streams: Vec<_> = self.dispatched.iter().map(|(s, _)| s.clone()).collect();
        streams.sort();
        streams
    }
}

/// Periodic flush supervisor
pub struct FlushScheduler<W: Writer> {
    buffer: Arc<StreamBuffer>,
    pool: Arc<WorkerPool<W>>,
    in_flight: Arc<InFlight>,
    metrics: Arc<FlushMetrics>,
    settings: SchedulerSettings,
}

impl<W: Writer> FlushScheduler<W> {
    pub fn new(
        buffer: Arc<StreamBuffer>,
        pool: Arc<WorkerPool<W>>,
        in_flight: Arc<InFlight>,
        metrics: Arc<FlushMetrics>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            buffer,
            pool,
            in_flight,
            metrics,
            settings,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Tick until cancelled
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            tick_ms = self.settings.tick_interval.as_millis() as u64,
            threshold_bytes = self.settings.stream_threshold_bytes,
            staleness_secs = self.settings.staleness.as_secs(),
            workers = self.pool.size(),
            "flush scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        info!("flush scheduler stopped");
    }

    /// Evaluate every stream once and dispatch the due ones
    pub fn tick(&self) -> TickOutcome {
        self.metrics.record_tick();

        let total = self.buffer.total_size_bytes();
        let limit = self.buffer.limits().max_global_bytes;
        let backpressured = self.buffer.is_backpressured();
        if total >= limit || backpressured {
            self.metrics.record_global_relief();
            let dispatched = self.dispatch_all(FlushReason::GlobalRelief);
            debug!(
                total_bytes = total,
                limit_bytes = limit,
                backpressured,
                streams = dispatched.len(),
                "global limit reached, flushing every stream"
            );
            return TickOutcome {
                global_relief: true,
                dispatched: dispatched
                    .into_iter()
                    .map(|s| (s, FlushReason::GlobalRelief))
                    .collect(),
                deferred: 0,
            };
        }

        // Read once; dispatches this tick count against the local copy only
        let mut capacity = self.pool.size().saturating_sub(self.pool.active());
        let optimal = self.pool.writer().optimal_batch_size_bytes();
        let now = Instant::now();
        let mut outcome = TickOutcome::default();

        for stream in self.buffer.streams() {
            let Some(reason) = self.due(&stream, optimal, now) else {
                continue;
            };

            if capacity == 0 {
                outcome.deferred += 1;
                continue;
            }

            if self.pool.submit(stream.clone(), reason).is_err() {
                debug!(stream = %stream, "worker pool closed, tick abandoned");
                break;
            }

            capacity -= 1;
            outcome.dispatched.push((stream, reason));
        }

        if outcome.deferred > 0 {
            debug!(
                deferred = outcome.deferred,
                "no free workers, due streams left for the next tick"
            );
        }

        outcome
    }

    /// Dispatch a flush for every known stream regardless of size or age
    ///
    /// Returns the streams that were accepted by the pool.
    pub fn dispatch_all(&self, reason: FlushReason) -> Vec<StreamDescriptor> {
        self.buffer
            .streams()
            .into_iter()
            .filter(|stream| self.pool.submit(stream.clone(), reason).is_ok())
            .collect()
    }

    /// Dispatch a flush for every stream that still holds data
    pub fn dispatch_pending(&self, reason: FlushReason) -> Vec<StreamDescriptor> {
        self.buffer
            .streams()
            .into_iter()
            .filter(|stream| self.buffer.queue_size_bytes(stream) > 0)
            .filter(|stream| self.pool.submit(stream.clone(), reason).is_ok())
            .collect()
    }

    fn due(&self, stream: &StreamDescriptor, optimal: u64, now: Instant) -> Option<FlushReason> {
        let queued = self.buffer.queue_size_bytes(stream);
        if queued == 0 {
            return None;
        }

        let claimed = self.in_flight.count(stream).saturating_mul(optimal);
        let pending = queued.saturating_sub(claimed);

        let age = self
            .buffer
            .time_of_last_record(stream)
            .map(|last| now.saturating_duration_since(last));

        trace!(
            stream = %stream,
            queued_bytes = queued,
            pending_bytes = pending,
            age_ms = age.map(|a| a.as_millis() as u64),
            "evaluating stream"
        );

        if pending > 0
            && (pending >= self.settings.stream_threshold_bytes
                || self.buffer.stream_backpressured(stream))
        {
            Some(FlushReason::Size)
        } else if age.is_some_and(|age| age > self.settings.staleness) {
            Some(FlushReason::Stale)
        } else {
            None
        }
    }
}
