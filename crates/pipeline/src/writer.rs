//! Writer trait definition

use crate::error::WriteError;
use spool_buffer::{Batch, StreamDescriptor};

/// Destination for flushed batches
///
/// Writers persist one batch per call and advertise the batch size they
/// prefer. The worker pool takes at most that many bytes per flush (a single
/// oversized record is still handed over alone).
pub trait Writer: Send + Sync + 'static {
    /// Returns the writer name (e.g., "null", "stdout")
    fn name(&self) -> &'static str;

    /// Preferred batch size in bytes
    fn optimal_batch_size_bytes(&self) -> u64;

    /// Persist one batch of `stream`
    ///
    /// Records are in enqueue order. An error is not retried: the batch is
    /// reported as lost on the pool's failure channel.
    fn flush(
        &self,
        stream: &StreamDescriptor,
        batch: &Batch,
    ) -> impl std::future::Future<Output = Result<(), WriteError>> + Send;
}

impl<T: Writer> Writer for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn optimal_batch_size_bytes(&self) -> u64 {
        (**self).optimal_batch_size_bytes()
    }

    fn flush(
        &self,
        stream: &StreamDescriptor,
        batch: &Batch,
    ) -> impl std::future::Future<Output = Result<(), WriteError>> + Send {
        (**self).flush(stream, batch)
    }
}
