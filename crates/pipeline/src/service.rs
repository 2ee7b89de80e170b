//! Flush service - owns the worker pool and scheduler, and drains on close
//!
//! # Shutdown
//!
//! [`FlushService::close`] stops the scheduler, dispatches one flush for every
//! known stream, closes the pool and waits for the workers up to the drain
//! timeout. Draining is best-effort: on timeout the report says so and the
//! remaining workers are left to finish on their own.

use crate::error::FlushFailure;
use crate::in_flight::InFlight;
use crate::metrics::FlushMetrics;
use crate::pool::{FlushReason, WorkerPool};
use crate::scheduler::{FlushScheduler, SchedulerSettings};
use crate::writer::Writer;
use spool_buffer::{StreamBuffer, StreamDescriptor};
use spool_config::FlushConfig;
use spool_metrics::{FlushMetricsProvider, FlushReport, WorkerInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(test)]
#[path = "service_test.rs"]
mod service_test;

/// Flush service tuning
#[derive(Debug, Clone, Copy)]
pub struct FlushSettings {
    pub workers: usize,
    pub scheduler: SchedulerSettings,
    pub drain_timeout: Duration,
}

impl From<&FlushConfig> for FlushSettings {
    fn from(config: &FlushConfig) -> Self {
        Self {
            workers: config.workers,
            scheduler: SchedulerSettings {
                stream_threshold_bytes: config.stream_threshold_bytes,
                staleness: config.staleness,
                tick_interval: config.tick_interval,
            },
            drain_timeout: config.drain_timeout,
        }
    }
}

impl Default for FlushSettings {
    fn default() -> Self {
        Self::from(&FlushConfig::default())
    }
}

/// Result of [`FlushService::close`]
#[derive(Debug)]
pub struct DrainReport {
    /// Shutdown flushes dispatched
    pub dispatched: usize,
    /// Every worker finished before the drain timeout
    pub complete: bool,
    /// Bytes still queued when the drain ended
    pub remaining_bytes: u64,
    /// Flushes that failed over the service's lifetime
    pub failed: u64,
    /// Failures not yet consumed through [`FlushService::take_failures`]
    pub failures: Vec<FlushFailure>,
    pub elapsed: Duration,
}

impl DrainReport {
    /// Drain finished in time, nothing left behind, nothing failed
    pub fn is_clean(&self) -> bool {
        self.complete && self.remaining_bytes == 0 && self.failed == 0
    }
}

/// Worker pool plus scheduler over one buffer
pub struct FlushService<W: Writer> {
    buffer: Arc<StreamBuffer>,
    pool: Arc<WorkerPool<W>>,
    scheduler: Arc<FlushScheduler<W>>,
    in_flight: Arc<InFlight>,
    metrics: Arc<FlushMetrics>,
    settings: FlushSettings,
    cancel: CancellationToken,
    scheduler_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    failures: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<FlushFailure>>>,
}

impl<W: Writer> FlushService<W> {
    /// Spawn the workers and the scheduler on the current runtime
    pub fn start(buffer: Arc<StreamBuffer>, writer: W, settings: FlushSettings) -> Self {
        let in_flight = Arc::new(InFlight::new());
        let metrics = Arc::new(FlushMetrics::new());

        let (pool, failures) = WorkerPool::spawn(
            settings.workers,
            Arc::clone(&buffer),
            Arc::new(writer),
            Arc::clone(&in_flight),
            Arc::clone(&metrics),
        );
        let pool = Arc::new(pool);

        let scheduler = Arc::new(FlushScheduler::new(
            Arc::clone(&buffer),
            Arc::clone(&pool),
            Arc::clone(&in_flight),
            Arc::clone(&metrics),
            settings.scheduler,
        ));

        let cancel = CancellationToken::new();
        let scheduler_task = tokio::spawn(Arc::clone(&scheduler).run(cancel.clone()));

        info!(
            workers = pool.size(),
            writer = pool.writer().name(),
            batch_bytes = pool.writer().optimal_batch_size_bytes(),
            drain_timeout_secs = settings.drain_timeout.as_secs(),
            "flush service started"
        );

        Self {
            buffer,
            pool,
            scheduler,
            in_flight,
            metrics,
            settings,
            cancel,
            scheduler_task: parking_lot::Mutex::new(Some(scheduler_task)),
            failures: parking_lot::Mutex::new(Some(failures)),
        }
    }

    pub fn buffer(&self) -> &Arc<StreamBuffer> {
        &self.buffer
    }

    pub fn settings(&self) -> &FlushSettings {
        &self.settings
    }

    /// Pool state for the periodic report
    pub fn worker_info(&self) -> WorkerInfo {
        WorkerInfo {
            pool_size: self.pool.size(),
            active_workers: self.pool.active(),
            queue_depth: self.pool.queue_depth(),
            in_progress: self.in_flight.in_progress(),
        }
    }

    /// Outstanding flush jobs for `stream`
    pub fn in_flight(&self, stream: &StreamDescriptor) -> u64 {
        self.in_flight.count(stream)
    }

    /// Get a handle for the metrics reporter
    pub fn metrics_handle(&self) -> FlushMetricsHandle<W> {
        FlushMetricsHandle {
            buffer: Arc::clone(&self.buffer),
            pool: Arc::clone(&self.pool),
            in_flight: Arc::clone(&self.in_flight),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Take the failure channel to supervise failures as they happen
    ///
    /// Returns `None` after the first call. Failures consumed here are not
    /// repeated in the [`DrainReport`].
    pub fn take_failures(&self) -> Option<mpsc::UnboundedReceiver<FlushFailure>> {
        self.failures.lock().take()
    }

    /// Stop scheduling, flush every stream and wait for the workers
    pub async fn close(&self) -> DrainReport {
        let started = Instant::now();

        self.cancel.cancel();
        let scheduler_task = self.scheduler_task.lock().take();
        if let Some(task) = scheduler_task {
            let _ = task.await;
        }

        info!(
            streams = self.buffer.stream_count(),
            queued_bytes = self.buffer.total_size_bytes(),
            timeout_secs = self.settings.drain_timeout.as_secs(),
            "draining buffer"
        );

        let mut dispatched = 0;
        let drain = async {
            // One batch per stream per round; repeat until the buffer is empty
            let mut round = self.scheduler.dispatch_all(FlushReason::Shutdown);
            loop {
                dispatched += round.len();
                self.pool.wait_idle().await;
                if self.buffer.total_size_bytes() == 0 {
                    break;
                }
                round = self.scheduler.dispatch_pending(FlushReason::Shutdown);
                if round.is_empty() {
                    break;
                }
            }
            self.pool.close();
            self.pool.join().await;
        };

        let complete = match tokio::time::timeout(self.settings.drain_timeout, drain).await {
            Ok(()) => true,
            Err(_) => {
                self.pool.close();
                warn!(
                    timeout_secs = self.settings.drain_timeout.as_secs(),
                    in_flight = self.in_flight.total(),
                    "drain timeout exceeded, shutting down with flushes outstanding"
                );
                false
            }
        };

        let mut failures = Vec::new();
        let receiver = self.failures.lock().take();
        if let Some(mut receiver) = receiver {
            while let Ok(failure) = receiver.try_recv() {
                failures.push(failure);
            }
        }

        let report = DrainReport {
            dispatched,
            complete,
            remaining_bytes: self.buffer.total_size_bytes(),
            failed: self.metrics.failed(),
            failures,
            elapsed: started.elapsed(),
        };

        info!(
            complete = report.complete,
            remaining_bytes = report.remaining_bytes,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "drain finished"
        );

        report
    }
}

/// Handle for collecting flush reports
///
/// Bridges the service to [`spool_metrics::Reporter`].
pub struct FlushMetricsHandle<W: Writer> {
    buffer: Arc<StreamBuffer>,
    pool: Arc<WorkerPool<W>>,
    in_flight: Arc<InFlight>,
    metrics: Arc<FlushMetrics>,
}

impl<W: Writer> FlushMetricsProvider for FlushMetricsHandle<W> {
    fn flush_report(&self) -> FlushReport {
        FlushReport {
            workers: WorkerInfo {
                pool_size: self.pool.size(),
                active_workers: self.pool.active(),
                queue_depth: self.pool.queue_depth(),
                in_progress: self.in_flight.in_progress(),
            },
            buffer: self.buffer.snapshot(),
            flush: self.metrics.snapshot(),
        }
    }
}
