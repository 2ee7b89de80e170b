//! Flush scheduling configuration
//!
//! Controls when streams are flushed and how many flushes run at once.
//!
//! # Defaults
//!
//! - `stream_threshold_bytes`: 10 MiB
//! - `staleness`: 5m
//! - `workers`: 5
//! - `tick_interval`: 1s
//! - `drain_timeout`: 5m

use serde::Deserialize;
use std::time::Duration;

/// Flush scheduler and worker pool configuration
///
/// # Example
///
/// ```toml
/// [flush]
/// stream_threshold_bytes = 10485760
/// staleness = "5m"
/// workers = 5
/// tick_interval = "1s"
/// drain_timeout = "5m"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    /// Pending bytes at which a stream is flushed
    /// Default: 10 MiB
    pub stream_threshold_bytes: u64,

    /// Time since the last record after which a non-empty stream is flushed
    /// regardless of size
    /// Default: 5m
    #[serde(with = "humantime_serde")]
    pub staleness: Duration,

    /// Number of concurrent flush workers
    /// Default: 5
    pub workers: usize,

    /// Scheduler tick period
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Upper bound on waiting for outstanding flushes at shutdown
    /// Default: 5m
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            stream_threshold_bytes: 10 * 1024 * 1024,
            staleness: Duration::from_secs(5 * 60),
            workers: 5,
            tick_interval: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(5 * 60),
        }
    }
}
