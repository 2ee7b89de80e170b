//! Spool - Sinks
//!
//! Writers that receive flushed batches from the worker pool.
//!
//! # Available Writers
//!
//! | Writer | Purpose |
//! |--------|---------|
//! | `null` | Benchmarking (discard all) |
//! | `stdout` | JSON lines for piping and debugging |
//!
//! # Example
//!
//! ```ignore
//! use spool_pipeline::{FlushService, FlushSettings};
//! use spool_sinks::null::NullWriter;
//!
//! let service = FlushService::start(buffer, NullWriter::new(), FlushSettings::default());
//! ```

mod common;

/// Null writer - discards all data (for benchmarking)
pub mod null;

/// Stdout writer - one JSON object per record
pub mod stdout;

pub use common::DEFAULT_BATCH_SIZE_BYTES;
pub use null::NullWriter;
pub use stdout::StdoutWriter;

#[cfg(test)]
pub(crate) mod testing {
    use spool_buffer::{Batch, BufferLimits, Record, StreamBuffer, StreamDescriptor};

    /// Build a batch holding `records` for `stream`
    pub fn batch(stream: &StreamDescriptor, records: &[&'static str]) -> Batch {
        let buffer = StreamBuffer::new(BufferLimits::default());
        for data in records {
            buffer.try_enqueue(stream, Record::new(*data)).unwrap();
        }
        buffer.take(stream, u64::MAX)
    }
}
