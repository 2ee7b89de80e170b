//! Spool Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid config - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use spool_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[flush]\nworkers = 8").unwrap();
//! assert_eq!(config.flush.workers, 8);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [buffer]
//! max_global_bytes = 1073741824
//! max_stream_bytes = 268435456
//!
//! [flush]
//! stream_threshold_bytes = 10485760
//! staleness = "5m"
//! workers = 5
//! tick_interval = "1s"
//! drain_timeout = "5m"
//!
//! [metrics]
//! interval = "15s"
//! format = "json"
//!
//! [log]
//! level = "debug"
//! ```

mod buffer;
mod error;
mod flush;
mod logging;
mod metrics;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use buffer::BufferConfig;
pub use error::{ConfigError, Result};
pub use flush::FlushConfig;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{MetricsConfig, MetricsFormat};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Memory bounds for the multi-stream buffer
    pub buffer: BufferConfig,

    /// Flush scheduling, worker pool and drain settings
    pub flush: FlushConfig,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks that bounds are non-zero and mutually consistent.
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
