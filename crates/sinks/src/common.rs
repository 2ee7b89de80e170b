//! Common types for writers

/// Default preferred batch size (10 MB)
pub const DEFAULT_BATCH_SIZE_BYTES: u64 = 10 * 1024 * 1024;
