//! Tests for the worker pool

use super::*;
use crate::error::WriteError;
use crate::test_writers::{TestWriter, wait_until};
use bytes::Bytes;
use spool_buffer::{BufferLimits, Record};

type TestPool = WorkerPool<TestWriter>;

struct Harness {
    buffer: Arc<StreamBuffer>,
    writer: Arc<TestWriter>,
    in_flight: Arc<InFlight>,
    metrics: Arc<FlushMetrics>,
    pool: TestPool,
    failures: mpsc::UnboundedReceiver<FlushFailure>,
}

fn harness(writer: TestWriter, workers: usize) -> Harness {
    let buffer = Arc::new(StreamBuffer::new(BufferLimits::new(10_000, 5_000)));
    let writer = Arc::new(writer);
    let in_flight = Arc::new(InFlight::new());
    let metrics = Arc::new(FlushMetrics::new());

    let (pool, failures) = WorkerPool::spawn(
        workers,
        Arc::clone(&buffer),
        Arc::clone(&writer),
        Arc::clone(&in_flight),
        Arc::clone(&metrics),
    );

    Harness {
        buffer,
        writer,
        in_flight,
        metrics,
        pool,
        failures,
    }
}

fn fill(buffer: &StreamBuffer, stream: &StreamDescriptor, records: &[&'static str]) {
    for data in records {
        buffer.try_enqueue(stream, Record::new(*data)).unwrap();
    }
}

// ============================================================================
// Successful flushes
// ============================================================================

#[tokio::test]
async fn test_flush_writes_records_in_order() {
    let h = harness(TestWriter::recording(1000), 2);
    let stream = StreamDescriptor::new("app", "users");
    fill(&h.buffer, &stream, &["one", "two", "three"]);

    h.pool.submit(stream.clone(), FlushReason::Size).unwrap();
    h.pool.wait_idle().await;

    assert_eq!(
        h.writer.records_for(&stream),
        vec![
            Bytes::from_static(b"one"),
            Bytes::from_static(b"two"),
            Bytes::from_static(b"three"),
        ]
    );
    assert_eq!(h.buffer.total_size_bytes(), 0);
    assert_eq!(h.buffer.batched_bytes(), 0);
    assert_eq!(h.in_flight.count(&stream), 0);

    let s = h.metrics.snapshot();
    assert_eq!(s.dispatched, 1);
    assert_eq!(s.completed, 1);
    assert_eq!(s.records_flushed, 3);
    assert_eq!(s.bytes_flushed, 11);
}

#[tokio::test]
async fn test_flush_takes_at_most_optimal_batch() {
    let h = harness(TestWriter::recording(10), 1);
    let stream = StreamDescriptor::unqualified("events");
    fill(&h.buffer, &stream, &["aaaa", "bbbb", "cccc"]);

    h.pool.submit(stream.clone(), FlushReason::Size).unwrap();
    h.pool.wait_idle().await;

    assert_eq!(h.writer.calls().len(), 1);
    assert_eq!(h.writer.records_for(&stream).len(), 2);
    assert_eq!(h.buffer.queue_size_bytes(&stream), 4);
}

#[tokio::test]
async fn test_oversized_record_flushed_alone() {
    let h = harness(TestWriter::recording(1), 1);
    let stream = StreamDescriptor::unqualified("big");
    let big = "x".repeat(1000);
    h.buffer.try_enqueue(&stream, Record::from(big)).unwrap();
    fill(&h.buffer, &stream, &["small"]);

    h.pool.submit(stream.clone(), FlushReason::Size).unwrap();
    h.pool.wait_idle().await;

    let calls = h.writer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.len(), 1);
    assert_eq!(calls[0].1[0].len(), 1000);
    assert_eq!(h.buffer.queue_size_records(&stream), 1);
}

#[tokio::test]
async fn test_empty_stream_skips_writer() {
    let h = harness(TestWriter::recording(1000), 1);
    let stream = StreamDescriptor::unqualified("idle");

    h.pool.submit(stream.clone(), FlushReason::Shutdown).unwrap();
    h.pool.wait_idle().await;

    assert_eq!(h.writer.started(), 0);
    assert_eq!(h.metrics.snapshot().empty_batches, 1);
    assert_eq!(h.metrics.snapshot().completed, 0);
    assert_eq!(h.in_flight.count(&stream), 0);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_writer_failure_is_published() {
    let mut h = harness(TestWriter::failing(1000), 1);
    let stream = StreamDescriptor::new("app", "orders");
    fill(&h.buffer, &stream, &["abc", "de"]);

    h.pool.submit(stream.clone(), FlushReason::Size).unwrap();
    let failure = h.failures.recv().await.unwrap();

    assert_eq!(failure.stream, stream);
    assert_eq!(failure.records, 2);
    assert_eq!(failure.bytes, 5);
    assert!(matches!(
        failure.error,
        FlushError::Writer {
            source: WriteError::Write(_),
            ..
        }
    ));

    h.pool.wait_idle().await;

    // Not retried: the records left the buffer with the batch
    assert_eq!(h.buffer.total_size_bytes(), 0);
    assert_eq!(h.buffer.batched_bytes(), 0);
    assert_eq!(h.in_flight.count(&stream), 0);
    assert_eq!(h.writer.started(), 1);
    assert_eq!(h.metrics.snapshot().failed, 1);
}

#[tokio::test]
async fn test_writer_panic_is_caught_and_worker_survives() {
    let mut h = harness(TestWriter::panicking(1000), 1);
    let a = StreamDescriptor::unqualified("a");
    let b = StreamDescriptor::unqualified("b");
    fill(&h.buffer, &a, &["1"]);
    fill(&h.buffer, &b, &["2"]);

    h.pool.submit(a.clone(), FlushReason::Size).unwrap();
    h.pool.submit(b.clone(), FlushReason::Size).unwrap();

    let first = h.failures.recv().await.unwrap();
    let second = h.failures.recv().await.unwrap();

    // The single worker handled both jobs
    assert_eq!(first.stream, a);
    assert_eq!(second.stream, b);
    match first.error {
        FlushError::Panicked { message, .. } => assert_eq!(message, "writer exploded"),
        other => panic!("expected panic failure, got {other:?}"),
    }

    h.pool.wait_idle().await;
    assert_eq!(h.buffer.batched_bytes(), 0);
    assert_eq!(h.in_flight.total(), 0);
    assert_eq!(h.pool.active(), 0);
}

// ============================================================================
// Pool state
// ============================================================================

#[tokio::test]
async fn test_active_queue_depth_and_in_progress() {
    let h = harness(TestWriter::gated(1000), 1);
    let a = StreamDescriptor::unqualified("a");
    let b = StreamDescriptor::unqualified("b");
    fill(&h.buffer, &a, &["1"]);
    fill(&h.buffer, &b, &["2"]);

    h.pool.submit(a.clone(), FlushReason::Size).unwrap();
    h.pool.submit(b.clone(), FlushReason::Size).unwrap();

    wait_until(|| h.writer.started() == 1).await;
    assert_eq!(h.pool.active(), 1);
    assert_eq!(h.pool.queue_depth(), 1);
    assert_eq!(h.in_flight.in_progress(), vec![a.clone()]);
    assert_eq!(h.in_flight.count(&a), 1);
    assert_eq!(h.in_flight.count(&b), 1);

    h.writer.open(2);
    h.pool.wait_idle().await;

    assert_eq!(h.pool.active(), 0);
    assert_eq!(h.pool.queue_depth(), 0);
    assert!(h.in_flight.in_progress().is_empty());
    assert_eq!(h.writer.calls().len(), 2);
}

#[tokio::test]
async fn test_submit_after_close_is_refused() {
    let h = harness(TestWriter::recording(1000), 2);
    let stream = StreamDescriptor::unqualified("late");

    h.pool.close();
    assert!(h.pool.is_closed());

    let result = h.pool.submit(stream.clone(), FlushReason::Size);
    assert!(matches!(result, Err(FlushError::ShuttingDown)));
    assert_eq!(h.in_flight.count(&stream), 0);
    assert_eq!(h.metrics.snapshot().dispatched, 0);

    h.pool.join().await;
}

#[tokio::test]
async fn test_join_runs_queued_jobs_first() {
    let h = harness(TestWriter::recording(1000), 1);
    let streams: Vec<_> = (0..5)
        .map(|i| StreamDescriptor::unqualified(format!("s{i}")))
        .collect();
    for stream in &streams {
        fill(&h.buffer, stream, &["data"]);
        h.pool.submit(stream.clone(), FlushReason::Shutdown).unwrap();
    }

    h.pool.close();
    h.pool.join().await;

    assert_eq!(h.writer.calls().len(), 5);
    assert_eq!(h.buffer.total_size_bytes(), 0);
}

#[tokio::test]
async fn test_wait_idle_with_nothing_in_flight() {
    let h = harness(TestWriter::recording(1000), 1);
    h.pool.wait_idle().await;
    assert_eq!(h.pool.size(), 1);
}

#[test]
fn test_flush_reason_display() {
    assert_eq!(FlushReason::Size.to_string(), "size");
    assert_eq!(FlushReason::Stale.to_string(), "stale");
    assert_eq!(FlushReason::GlobalRelief.to_string(), "global_relief");
    assert_eq!(FlushReason::Shutdown.to_string(), "shutdown");
}
