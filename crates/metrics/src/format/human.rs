//! Human-readable report formatter
//!
//! # Example Output
//!
//! ```text
//! [workers] pool: 5 | active: 2 | queued: 0 | in progress: app.users, app.orders
//! [buffer] queued: 12.0 MB (1.2K records, 4 streams) | batched: 10.0 MB | blocked: 0
//! [flush] dispatched: 120 | completed: 118 | failed: 0 | empty: 1 | flushed: 1.2M records, 1.1 GB | 2.0 MB/s
//! ```

use super::{ReportFormatter, format_bytes, format_bytes_per_sec, format_count};
use crate::{FlushReport, WorkerInfo};
use spool_buffer::BufferSnapshot;
use std::fmt::Write;
use std::time::Duration;

/// Human-readable report formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    /// Create a new human formatter
    pub fn new() -> Self {
        Self
    }

    fn format_workers(&self, workers: &WorkerInfo) -> String {
        let mut output = format!(
            "[workers] pool: {} | active: {} | queued: {} | in progress: ",
            workers.pool_size, workers.active_workers, workers.queue_depth,
        );

        if workers.in_progress.is_empty() {
            output.push_str("none");
        } else {
            for (i, stream) in workers.in_progress.iter().enumerate() {
                if i > 0 {
                    output.push_str(", ");
                }
                let _ = write!(output, "{}", stream);
            }
        }

        output
    }

    fn format_buffer(&self, buffer: &BufferSnapshot) -> String {
        format!(
            "[buffer] queued: {} ({} records, {} streams) | batched: {} | blocked: {}",
            format_bytes(buffer.total_bytes),
            format_count(buffer.total_records),
            buffer.stream_count,
            format_bytes(buffer.batched_bytes),
            buffer.blocked_enqueues,
        )
    }

    fn format_flush(
        &self,
        report: &FlushReport,
        previous: Option<&FlushReport>,
        elapsed: Option<Duration>,
    ) -> String {
        let flush = &report.flush;
        let mut output = format!(
            "[flush] dispatched: {} | completed: {} | failed: {} | empty: {} | flushed: {} records, {}",
            format_count(flush.dispatched),
            format_count(flush.completed),
            flush.failed,
            flush.empty_batches,
            format_count(flush.records_flushed),
            format_bytes(flush.bytes_flushed),
        );

        if let (Some(previous), Some(elapsed)) = (previous, elapsed)
            && !elapsed.is_zero()
        {
            let delta = flush.diff(&previous.flush);
            let _ = write!(
                output,
                " | {}",
                format_bytes_per_sec(delta.bytes_flushed as f64 / elapsed.as_secs_f64())
            );
        }

        if flush.global_relief_ticks > 0 {
            let _ = write!(output, " | relief: {}", flush.global_relief_ticks);
        }

        if flush.in_flight_underflows > 0 {
            let _ = write!(output, " | underflows: {}", flush.in_flight_underflows);
        }

        output
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_report(
        &self,
        report: &FlushReport,
        previous: Option<&FlushReport>,
        elapsed: Option<Duration>,
    ) -> String {
        [
            self.format_workers(&report.workers),
            self.format_buffer(&report.buffer),
            self.format_flush(report, previous, elapsed),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlushSnapshot;
    use spool_buffer::StreamDescriptor;

    fn make_report() -> FlushReport {
        FlushReport {
            workers: WorkerInfo {
                pool_size: 5,
                active_workers: 2,
                queue_depth: 0,
                in_progress: vec![
                    StreamDescriptor::new("app", "users"),
                    StreamDescriptor::unqualified("orders"),
                ],
            },
            buffer: BufferSnapshot {
                total_bytes: 12 * 1024 * 1024,
                total_records: 1200,
                stream_count: 4,
                batched_bytes: 10 * 1024 * 1024,
                blocked_enqueues: 0,
            },
            flush: FlushSnapshot {
                dispatched: 120,
                completed: 118,
                empty_batches: 1,
                records_flushed: 1_200_000,
                bytes_flushed: 30 * 1024 * 1024,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_format_first_report() {
        let output = HumanFormatter::new().format_report(&make_report(), None, None);
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "[workers] pool: 5 | active: 2 | queued: 0 | in progress: app.users, orders"
        );
        assert_eq!(
            lines[1],
            "[buffer] queued: 12.0 MB (1.2K records, 4 streams) | batched: 10.0 MB | blocked: 0"
        );
        assert_eq!(
            lines[2],
            "[flush] dispatched: 120 | completed: 118 | failed: 0 | empty: 1 | flushed: 1.2M records, 30.0 MB"
        );
    }

    #[test]
    fn test_format_idle_workers() {
        let report = FlushReport::default();
        let output = HumanFormatter::new().format_report(&report, None, None);
        assert!(output.starts_with("[workers] pool: 0 | active: 0 | queued: 0 | in progress: none"));
    }

    #[test]
    fn test_format_rate_from_previous() {
        let previous = make_report();
        let mut current = make_report();
        current.flush.bytes_flushed += 20 * 1024 * 1024;

        let output = HumanFormatter::new().format_report(
            &current,
            Some(&previous),
            Some(Duration::from_secs(10)),
        );

        assert!(output.ends_with("| 2.0 MB/s"), "got: {output}");
    }

    #[test]
    fn test_format_flags_relief_and_underflows() {
        let mut report = make_report();
        report.flush.global_relief_ticks = 3;
        report.flush.in_flight_underflows = 1;

        let output = HumanFormatter::new().format_report(&report, None, None);
        assert!(output.contains("| relief: 3"));
        assert!(output.contains("| underflows: 1"));
    }
}
