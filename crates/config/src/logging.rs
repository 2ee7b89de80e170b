//! `[log]` section
//!
//! Spool logs to stderr only; stdout belongs to the stdout writer. The
//! configured level applies to spool's own crates while dependencies stay at
//! `warn`, so `debug` shows dispatches and takes without runtime noise.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Crates the configured level applies to
const SPOOL_TARGETS: &[&str] = &[
    "spool",
    "spool_buffer",
    "spool_config",
    "spool_metrics",
    "spool_pipeline",
    "spool_sinks",
];

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Adds the per-stream evaluation of every tick
    Trace,
    /// Adds each dispatch, take and flush result
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `EnvFilter` directive for this level
    ///
    /// `warn` and `error` apply to every target. Lower levels are scoped to
    /// the spool crates on top of a `warn` default.
    pub fn filter_directive(&self) -> String {
        if matches!(self, Self::Warn | Self::Error) {
            return self.as_str().to_string();
        }

        SPOOL_TARGETS
            .iter()
            .fold(String::from("warn"), |mut directive, target| {
                directive.push(',');
                directive.push_str(target);
                directive.push('=');
                directive.push_str(self.as_str());
                directive
            })
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, for `--log-level`
impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "unknown log level '{s}', expected trace, debug, info, warn or error"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text lines
    #[default]
    Console,
    /// One JSON object per event
    Json,
}

/// ```toml
/// [log]
/// level = "info"
/// format = "console"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_defaults() {
        let config: LogConfig = toml::from_str("").unwrap();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Console);
    }

    #[test]
    fn test_json_format() {
        let config: LogConfig = toml::from_str("level = \"debug\"\nformat = \"json\"").unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_level_rejected() {
        let result: Result<LogConfig, _> = toml::from_str("level = \"verbose\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_level_from_flag() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warn));

        let err = "loud".parse::<LogLevel>().unwrap_err();
        assert!(err.contains("loud"));
    }

    #[test]
    fn test_low_levels_are_scoped_to_spool_crates() {
        let directive = LogLevel::Debug.filter_directive();
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("spool_pipeline=debug"));
        assert!(directive.contains("spool_buffer=debug"));
        assert!(directive.contains(",spool=debug"));
    }

    #[test]
    fn test_high_levels_apply_everywhere() {
        assert_eq!(LogLevel::Warn.filter_directive(), "warn");
        assert_eq!(LogLevel::Error.filter_directive(), "error");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}
