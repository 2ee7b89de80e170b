//! Buffer error types

use thiserror::Error;

use crate::{Record, StreamDescriptor};

/// Buffer errors
#[derive(Debug, Error)]
pub enum BufferError {
    /// Admitting the record would exceed the stream or global bound.
    /// The record is handed back to the caller.
    #[error("buffer full for stream {stream}")]
    Full {
        /// Target stream
        stream: StreamDescriptor,
        /// The rejected record
        record: Record,
    },

    /// The buffer has been closed and accepts no more records
    #[error("buffer is closed")]
    Closed,
}

impl BufferError {
    /// Recover the record from a `Full` error
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Full { record, .. } => Some(record),
            Self::Closed => None,
        }
    }
}

/// Result type for buffer operations
pub type Result<T> = std::result::Result<T, BufferError>;
