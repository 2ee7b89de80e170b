//! Configuration validation
//!
//! Validates config consistency:
//! - Buffer bounds are non-zero and the per-stream bound fits the global one
//! - The flush threshold is reachable under the per-stream bound
//! - The worker pool and scheduler period are usable

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_buffer(config)?;
    validate_flush(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn validate_buffer(config: &Config) -> Result<()> {
    let buffer = &config.buffer;

    if buffer.max_global_bytes == 0 {
        return Err(ConfigError::invalid_value(
            "buffer",
            "max_global_bytes",
            "must be greater than 0",
        ));
    }

    if buffer.max_stream_bytes == 0 {
        return Err(ConfigError::invalid_value(
            "buffer",
            "max_stream_bytes",
            "must be greater than 0",
        ));
    }

    if buffer.max_stream_bytes > buffer.max_global_bytes {
        return Err(ConfigError::invalid_value(
            "buffer",
            "max_stream_bytes",
            format!(
                "{} exceeds max_global_bytes ({})",
                buffer.max_stream_bytes, buffer.max_global_bytes
            ),
        ));
    }

    Ok(())
}

fn validate_flush(config: &Config) -> Result<()> {
    let flush = &config.flush;

    if flush.workers == 0 {
        return Err(ConfigError::invalid_value(
            "flush",
            "workers",
            "must be at least 1",
        ));
    }

    if flush.tick_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "flush",
            "tick_interval",
            "must be greater than 0",
        ));
    }

    // A stream stops growing at its own bound, which already fits the global one
    if flush.stream_threshold_bytes > config.buffer.max_stream_bytes {
        return Err(ConfigError::invalid_value(
            "flush",
            "stream_threshold_bytes",
            format!(
                "{} exceeds buffer.max_stream_bytes ({})",
                flush.stream_threshold_bytes, config.buffer.max_stream_bytes
            ),
        ));
    }

    Ok(())
}

fn validate_metrics(config: &Config) -> Result<()> {
    if config.metrics.active_interval().is_some_and(|i| i.is_zero()) {
        return Err(ConfigError::invalid_value(
            "metrics",
            "interval",
            "must be greater than 0 when metrics are enabled",
        ));
    }
    Ok(())
}
