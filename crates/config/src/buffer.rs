//! Buffer bound configuration
//!
//! Memory bounds for the multi-stream buffer. Producers block once either
//! bound would be exceeded.

use serde::Deserialize;

/// Default global bound across all streams (1 GiB)
pub const DEFAULT_MAX_GLOBAL_BYTES: u64 = 1024 * 1024 * 1024;

/// Default per-stream bound (256 MiB)
pub const DEFAULT_MAX_STREAM_BYTES: u64 = 256 * 1024 * 1024;

/// Buffer bound configuration
///
/// # Example
///
/// ```toml
/// [buffer]
/// max_global_bytes = 1073741824
/// max_stream_bytes = 268435456
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum bytes queued across all streams
    /// Default: 1 GiB
    pub max_global_bytes: u64,

    /// Maximum bytes queued for a single stream
    /// Default: 256 MiB
    pub max_stream_bytes: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_global_bytes: DEFAULT_MAX_GLOBAL_BYTES,
            max_stream_bytes: DEFAULT_MAX_STREAM_BYTES,
        }
    }
}
