//! Opaque record payload

use bytes::Bytes;

/// A single buffered record
///
/// The payload is opaque to the buffer; only its byte size is accounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    data: Bytes,
}

impl Record {
    /// Create a record from serialized bytes
    #[inline]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Serialized payload
    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the record, returning the payload
    #[inline]
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Size counted against buffer bounds
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

impl From<Bytes> for Record {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for Record {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<String> for Record {
    fn from(data: String) -> Self {
        Self::new(data)
    }
}
