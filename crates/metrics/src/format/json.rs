//! JSON report formatter
//!
//! Formats reports as one JSON object per line for machine parsing.
//!
//! # Example Output
//!
//! ```json
//! {
//!   "type": "flush_report",
//!   "workers": { "pool_size": 5, "active_workers": 2, "queue_depth": 0, "in_progress": ["app.users"] },
//!   "buffer": { "total_bytes": 12582912, "total_records": 1200, ... },
//!   "flush": { "dispatched": 120, "completed": 118, ... },
//!   "interval": { "elapsed_ms": 15000, "dispatched": 12, "bytes_per_sec": 2097152 }
//! }
//! ```

use super::ReportFormatter;
use crate::{FlushReport, FlushSnapshot};
use serde::Serialize;
use std::time::Duration;

/// JSON report formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct ReportJson {
    #[serde(rename = "type")]
    report_type: &'static str,
    workers: WorkersJson,
    buffer: BufferJson,
    flush: FlushJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<IntervalJson>,
}

#[derive(Serialize)]
struct WorkersJson {
    pool_size: usize,
    active_workers: usize,
    queue_depth: usize,
    in_progress: Vec<String>,
}

#[derive(Serialize)]
struct BufferJson {
    total_bytes: u64,
    total_records: u64,
    stream_count: usize,
    batched_bytes: u64,
    blocked_enqueues: u64,
}

#[derive(Serialize)]
struct FlushJson {
    ticks: u64,
    global_relief_ticks: u64,
    dispatched: u64,
    completed: u64,
    failed: u64,
    empty_batches: u64,
    records_flushed: u64,
    bytes_flushed: u64,
    in_flight_underflows: u64,
}

impl From<&FlushSnapshot> for FlushJson {
    fn from(s: &FlushSnapshot) -> Self {
        Self {
            ticks: s.ticks,
            global_relief_ticks: s.global_relief_ticks,
            dispatched: s.dispatched,
            completed: s.completed,
            failed: s.failed,
            empty_batches: s.empty_batches,
            records_flushed: s.records_flushed,
            bytes_flushed: s.bytes_flushed,
            in_flight_underflows: s.in_flight_underflows,
        }
    }
}

#[derive(Serialize)]
struct IntervalJson {
    elapsed_ms: u64,
    dispatched: u64,
    completed: u64,
    failed: u64,
    bytes_per_sec: u64,
}

impl ReportFormatter for JsonFormatter {
    fn format_report(
        &self,
        report: &FlushReport,
        previous: Option<&FlushReport>,
        elapsed: Option<Duration>,
    ) -> String {
        let interval = match (previous, elapsed) {
            (Some(previous), Some(elapsed)) if !elapsed.is_zero() => {
                let delta = report.flush.diff(&previous.flush);
                Some(IntervalJson {
                    elapsed_ms: elapsed.as_millis() as u64,
                    dispatched: delta.dispatched,
                    completed: delta.completed,
                    failed: delta.failed,
                    bytes_per_sec: (delta.bytes_flushed as f64 / elapsed.as_secs_f64()) as u64,
                })
            }
            _ => None,
        };

        let json = ReportJson {
            report_type: "flush_report",
            workers: WorkersJson {
                pool_size: report.workers.pool_size,
                active_workers: report.workers.active_workers,
                queue_depth: report.workers.queue_depth,
                in_progress: report
                    .workers
                    .in_progress
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            },
            buffer: BufferJson {
                total_bytes: report.buffer.total_bytes,
                total_records: report.buffer.total_records,
                stream_count: report.buffer.stream_count,
                batched_bytes: report.buffer.batched_bytes,
                blocked_enqueues: report.buffer.blocked_enqueues,
            },
            flush: FlushJson::from(&report.flush),
            interval,
        };

        serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
    }
}
