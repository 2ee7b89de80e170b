//! Writers for exercising the pool, scheduler and drain

use crate::error::WriteError;
use crate::writer::Writer;
use bytes::Bytes;
use parking_lot::Mutex;
use spool_buffer::{Batch, StreamDescriptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Records every batch it is given
///
/// A gated writer holds each flush until [`TestWriter::open`] releases it.
pub struct TestWriter {
    batch_bytes: u64,
    behavior: Behavior,
    gate: Option<Semaphore>,
    started: AtomicUsize,
    calls: Mutex<Vec<(StreamDescriptor, Vec<Bytes>)>>,
}

impl TestWriter {
    fn with(batch_bytes: u64, behavior: Behavior, gated: bool) -> Self {
        Self {
            batch_bytes,
            behavior,
            gate: gated.then(|| Semaphore::new(0)),
            started: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn recording(batch_bytes: u64) -> Self {
        Self::with(batch_bytes, Behavior::Succeed, false)
    }

    pub fn gated(batch_bytes: u64) -> Self {
        Self::with(batch_bytes, Behavior::Succeed, true)
    }

    pub fn failing(batch_bytes: u64) -> Self {
        Self::with(batch_bytes, Behavior::Fail, false)
    }

    pub fn panicking(batch_bytes: u64) -> Self {
        Self::with(batch_bytes, Behavior::Panic, false)
    }

    /// Let `n` gated flushes complete
    pub fn open(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Flush calls that have started (gated ones included)
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Successful batches, in completion order
    pub fn calls(&self) -> Vec<(StreamDescriptor, Vec<Bytes>)> {
        self.calls.lock().clone()
    }

    /// Records written for `stream`, in order
    pub fn records_for(&self, stream: &StreamDescriptor) -> Vec<Bytes> {
        self.calls
            .lock()
            .iter()
            .filter(|(s, _)| s == stream)
            .flat_map(|(_, records)| records.iter().cloned())
            .collect()
    }
}

impl Writer for TestWriter {
    fn name(&self) -> &'static str {
        "test"
    }

    fn optimal_batch_size_bytes(&self) -> u64 {
        self.batch_bytes
    }

    async fn flush(&self, stream: &StreamDescriptor, batch: &Batch) -> Result<(), WriteError> {
        self.started.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| WriteError::Write(e.to_string()))?
                .forget();
        }

        match self.behavior {
            Behavior::Succeed => {
                let records = batch.iter().map(|r| r.data().clone()).collect();
                self.calls.lock().push((stream.clone(), records));
                Ok(())
            }
            Behavior::Fail => Err(WriteError::Write("destination unavailable".into())),
            Behavior::Panic => panic!("writer exploded"),
        }
    }
}

/// Yield until `condition` holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
