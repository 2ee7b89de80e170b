//! Null writer - discards all data
//!
//! Used for benchmarking the buffer and worker pool without any I/O
//! overhead. The flush service still counts every batch it hands over.

use spool_buffer::{Batch, StreamDescriptor};
use spool_pipeline::{WriteError, Writer};

use crate::common::DEFAULT_BATCH_SIZE_BYTES;


/// Writer that accepts and discards every batch
#[derive(Debug, Clone, Copy)]
pub struct NullWriter {
    batch_size_bytes: u64,
}

impl NullWriter {
    /// Create a null writer with the default batch size
    pub fn new() -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE_BYTES)
    }

    /// Create a null writer that asks for `batch_size_bytes` per flush
    pub fn with_batch_size(batch_size_bytes: u64) -> Self {
        Self {
            batch_size_bytes: batch_size_bytes.max(1),
        }
    }
}

impl Default for NullWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for NullWriter {
    fn name(&self) -> &'static str {
        "null"
    }

    fn optimal_batch_size_bytes(&self) -> u64 {
        self.batch_size_bytes
    }

    async fn flush(&self, _stream: &StreamDescriptor, _batch: &Batch) -> Result<(), WriteError> {
        Ok(())
    }
}
