//! Run command - buffer stdin and flush until EOF or a shutdown signal

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use spool_buffer::{BufferLimits, StreamBuffer};
use spool_config::Config;
use spool_metrics::Reporter;
use spool_pipeline::{DrainReport, FlushService, FlushSettings, Writer};
use spool_sinks::{DEFAULT_BATCH_SIZE_BYTES, NullWriter, StdoutWriter};
use tokio::io::BufReader;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cmd::ingest::ingest;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_PATH: &str = "spool.toml";

/// How long the reporter gets to print its last report
const REPORTER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Destination for flushed batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriterKind {
    /// Count and discard
    Null,
    /// JSON lines on stdout
    Stdout,
}

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to configuration file (error if specified but not found)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where flushed batches go
    #[arg(short, long, value_enum, default_value_t = WriterKind::Stdout)]
    pub writer: WriterKind,

    /// Preferred batch size in bytes
    #[arg(short, long)]
    pub batch_size: Option<u64>,
}

/// Load configuration: explicit path must exist, otherwise `spool.toml` if
/// present, otherwise defaults
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            Config::from_file(path).context("failed to load configuration")
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Config::from_file(default).context("failed to load configuration")
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Run until stdin ends or a shutdown signal arrives, then drain
///
/// Exits with failure if any flush failed or the drain was incomplete.
pub async fn run(args: RunArgs, config: Config) -> Result<ExitCode> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        writer = ?args.writer,
        max_global_bytes = config.buffer.max_global_bytes,
        max_stream_bytes = config.buffer.max_stream_bytes,
        "spool starting"
    );

    let batch_size = args.batch_size.unwrap_or(DEFAULT_BATCH_SIZE_BYTES);
    let report = match args.writer {
        WriterKind::Null => serve(&config, NullWriter::with_batch_size(batch_size)).await?,
        WriterKind::Stdout => serve(&config, StdoutWriter::new().with_batch_size(batch_size)).await?,
    };

    if report.is_clean() {
        info!("spool shutdown complete");
        return Ok(ExitCode::SUCCESS);
    }

    error!(
        complete = report.complete,
        failed = report.failed,
        remaining_bytes = report.remaining_bytes,
        "spool shut down with unflushed data"
    );
    Ok(ExitCode::FAILURE)
}

async fn serve<W: Writer>(config: &Config, writer: W) -> Result<DrainReport> {
    let limits = BufferLimits::new(config.buffer.max_global_bytes, config.buffer.max_stream_bytes);
    let buffer = Arc::new(StreamBuffer::new(limits));
    let service = FlushService::start(Arc::clone(&buffer), writer, FlushSettings::from(&config.flush));

    let cancel = CancellationToken::new();
    let reporter = Reporter::new(config.metrics.clone(), Arc::new(service.metrics_handle()));
    let reporter_task = tokio::spawn(reporter.run(cancel.clone()));

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = ingest(stdin, &buffer) => match result {
            Ok(stats) => info!(
                records = stats.records,
                bytes = stats.bytes,
                malformed = stats.malformed,
                "input finished, draining..."
            ),
            Err(e) => error!(error = %e, "reading input failed, draining..."),
        },
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, draining...");
        }
    }

    // No producer may enqueue past this point
    buffer.close();
    let report = service.close().await;

    cancel.cancel();
    match tokio::time::timeout(REPORTER_SHUTDOWN_TIMEOUT, reporter_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "metrics reporter panicked"),
        Err(_) => warn!("metrics reporter did not stop within timeout"),
    }

    Ok(report)
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
