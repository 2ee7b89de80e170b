//! Pipeline error types
//!
//! Writers report [`WriteError`]; the worker pool wraps it (or a caught panic)
//! in a [`FlushError`] and publishes a [`FlushFailure`] for every lost batch.

use spool_buffer::StreamDescriptor;
use thiserror::Error;

/// Error returned by a [`Writer`](crate::Writer)
#[derive(Debug, Error)]
pub enum WriteError {
    /// Destination rejected or failed the write
    #[error("write failed: {0}")]
    Write(String),

    /// I/O error talking to the destination
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded for the destination
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Flush errors
#[derive(Debug, Error)]
pub enum FlushError {
    /// The writer returned an error
    #[error("writer failed for stream {stream}: {source}")]
    Writer {
        stream: StreamDescriptor,
        #[source]
        source: WriteError,
    },

    /// The writer panicked; the worker survived
    #[error("writer panicked for stream {stream}: {message}")]
    Panicked {
        stream: StreamDescriptor,
        message: String,
    },

    /// The pool no longer accepts jobs
    #[error("worker pool is shutting down")]
    ShuttingDown,
}

/// A batch that was taken from the buffer but never written
///
/// Its records are gone from the buffer; replaying them is up to whoever
/// produced them.
#[derive(Debug, Error)]
#[error("lost {records} records ({bytes} bytes) of stream {stream}: {error}")]
pub struct FlushFailure {
    pub stream: StreamDescriptor,
    pub records: usize,
    pub bytes: u64,
    #[source]
    pub error: FlushError,
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, FlushError>;
