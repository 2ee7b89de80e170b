//! Spool Metrics - periodic reporting for the flush pipeline
//!
//! Components expose cheap point-in-time snapshots; the [`Reporter`] polls a
//! [`FlushMetricsProvider`] at the configured interval and logs a human or JSON
//! rendering of the combined [`FlushReport`].
//!
//! # Example Output
//!
//! ```text
//! [workers] pool: 5 | active: 2 | queued: 0 | in progress: app.users, app.orders
//! [buffer] queued: 12.0 MB (1.2K records, 4 streams) | batched: 10.0 MB | blocked: 0
//! [flush] dispatched: 120 | completed: 118 | failed: 0 | empty: 1 | flushed: 1.2M records, 1.1 GB | 2.0 MB/s
//! ```

mod format;
mod reporter;
mod traits;

pub use format::{
    HumanFormatter, JsonFormatter, ReportFormatter, format_bytes, format_bytes_per_sec,
    format_count, format_duration,
};
pub use reporter::Reporter;
pub use traits::{FlushMetricsProvider, FlushReport, FlushSnapshot, WorkerInfo};

pub use spool_buffer::BufferSnapshot;
