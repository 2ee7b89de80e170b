//! `[metrics]` section
//!
//! The reporter logs worker, buffer and flush state once per `interval`.
//! Rates in the report are computed over the same interval.

use serde::Deserialize;
use std::time::Duration;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// `[workers]`, `[buffer]` and `[flush]` lines
    #[default]
    Human,
    /// One `flush_report` object per interval
    Json,
}

/// ```toml
/// [metrics]
/// enabled = true
/// interval = "15s"
/// format = "human"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub format: MetricsFormat,
}

impl MetricsConfig {
    /// Reporting period, or `None` when reporting is off
    pub fn active_interval(&self) -> Option<Duration> {
        self.enabled.then_some(self.interval)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_INTERVAL,
            format: MetricsFormat::Human,
        }
    }
}
