//! Batch of records taken from a stream's head

use std::sync::Arc;

use crate::buffer::Accounting;
use crate::{Record, StreamDescriptor};

/// Ordered records drawn from one stream's queue head
///
/// The records have already left the queue. While the batch is alive its
/// weight is reported as `batched_bytes`; dropping the batch releases it,
/// on the success and failure paths alike.
#[derive(Debug)]
pub struct Batch {
    stream: StreamDescriptor,
    records: Vec<Record>,
    size_bytes: u64,
    accounting: Option<Arc<Accounting>>,
}

impl Batch {
    pub(crate) fn new(
        stream: StreamDescriptor,
        records: Vec<Record>,
        size_bytes: u64,
        accounting: Arc<Accounting>,
    ) -> Self {
        Self {
            stream,
            records,
            size_bytes,
            accounting: Some(accounting),
        }
    }

    /// An empty batch that holds no accounted bytes
    pub fn empty(stream: StreamDescriptor) -> Self {
        Self {
            stream,
            records: Vec::new(),
            size_bytes: 0,
            accounting: None,
        }
    }

    /// Stream the records came from
    #[inline]
    pub fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    /// Records in enqueue order
    #[inline]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Iterate records in enqueue order
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Number of records
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the batch holds no records
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total size of the records in bytes
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        if let Some(accounting) = self.accounting.take() {
            accounting.release_batch(self.size_bytes);
        }
    }
}
