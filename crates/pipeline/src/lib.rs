//! Spool - Pipeline
//!
//! Moves records from the [`StreamBuffer`] to a [`Writer`].
//!
//! # Architecture
//!
//! ```text
//! [Producers] ──enqueue──→ StreamBuffer ←──take── [WorkerPool] ──flush──→ Writer
//!                               ↑                      ↑
//!                         reads sizes            submit(stream)
//!                               └──── FlushScheduler ──┘
//!                                    (one tick per second)
//! ```
//!
//! # Key Design
//!
//! - **Single scheduler task**: ticks never overlap, late ticks are skipped
//! - **Global relief first**: a full buffer flushes every stream before any
//!   per-stream heuristic runs
//! - **Fail fast**: a failed batch is reported on the failure channel and not
//!   retried; its records are gone from the buffer (at-most-once)
//! - **Bounded drain**: [`FlushService::close`] flushes everything it can
//!   within the drain timeout and reports what it could not
//!
//! # Example
//!
//! ```ignore
//! use spool_buffer::{StreamBuffer, StreamDescriptor, Record};
//! use spool_pipeline::{FlushService, FlushSettings};
//!
//! let buffer = Arc::new(StreamBuffer::default());
//! let service = FlushService::start(Arc::clone(&buffer), writer, FlushSettings::default());
//!
//! buffer.enqueue(&StreamDescriptor::new("app", "users"), Record::from("{}")).await?;
//!
//! let report = service.close().await;
//! assert!(report.complete);
//! ```

mod error;
mod in_flight;
mod metrics;
mod pool;
mod scheduler;
mod service;
mod writer;

pub use error::{FlushError, FlushFailure, Result, WriteError};
pub use in_flight::InFlight;
pub use metrics::FlushMetrics;
pub use pool::{FlushJob, FlushReason, WorkerPool};
pub use scheduler::{FlushScheduler, SchedulerSettings, TickOutcome};
pub use service::{DrainReport, FlushMetricsHandle, FlushService, FlushSettings};
pub use writer::Writer;

pub use spool_buffer::{Batch, Record, StreamBuffer, StreamDescriptor};

#[cfg(test)]
mod test_writers;
