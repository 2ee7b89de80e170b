//! Spool - bounded multi-stream buffer with batched flushing
//!
//! # Usage
//!
//! ```bash
//! # Buffer NDJSON from stdin and print flushed batches as JSON lines
//! producer | spool
//!
//! # Benchmark: discard everything, 1 MB batches
//! producer | spool --writer null --batch-size 1048576
//!
//! # Custom configuration
//! spool --config spool.toml --log-level debug
//! ```

mod cmd;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use spool_config::{LogFormat, LogLevel};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Spool - bounded multi-stream buffer with batched flushing
#[derive(Parser, Debug)]
#[command(name = "spool")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    run: cmd::run::RunArgs,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = cmd::run::load_config(cli.run.config.as_deref())?;
    let log_level = resolve_log_level(cli.log_level, config.log.level);
    init_logging(log_level, config.log.format)?;

    cmd::run::run(cli.run, config).await
}

/// Resolve log level: CLI flag > config file (which defaults to info)
fn resolve_log_level(cli_level: Option<LogLevel>, config_level: LogLevel) -> LogLevel {
    cli_level.unwrap_or(config_level)
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr; stdout carries writer output.
fn init_logging(level: LogLevel, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level.filter_directive())
        .map_err(|e| anyhow::anyhow!("invalid log filter for level {}: {}", level, e))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
