//! Periodic flush reporter
//!
//! Polls a [`FlushMetricsProvider`] at the configured interval and logs the
//! formatted report via tracing. Runs as its own task until cancelled.

use crate::{FlushMetricsProvider, FlushReport, HumanFormatter, JsonFormatter, ReportFormatter};
use spool_config::{MetricsConfig, MetricsFormat};
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Periodic reporter for worker, buffer and flush state
pub struct Reporter {
    config: MetricsConfig,
    formatter: Box<dyn ReportFormatter>,
    provider: Arc<dyn FlushMetricsProvider>,
    previous: Option<(FlushReport, Instant)>,
}

impl Reporter {
    /// Create a reporter for `provider`
    pub fn new(config: MetricsConfig, provider: Arc<dyn FlushMetricsProvider>) -> Self {
        let formatter: Box<dyn ReportFormatter> = match config.format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        };

        Self {
            config,
            formatter,
            provider,
            previous: None,
        }
    }

    /// Run the reporter until cancellation
    ///
    /// Spawn this as a tokio task. Returns immediately when reporting is
    /// disabled.
    pub async fn run(mut self, cancel: CancellationToken) {
        let Some(period) = self.config.active_interval() else {
            info!("metrics reporting disabled");
            return;
        };

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = period.as_secs(),
            format = ?self.config.format,
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.report();
                }
            }
        }
    }

    fn report(&mut self) {
        // Human output spans several lines; log them separately
        for line in self.render().lines() {
            info!("{}", line);
        }
    }

    /// Collect one report and format it against the previous one
    fn render(&mut self) -> String {
        let now = Instant::now();
        let report = self.provider.flush_report();

        let output = match &self.previous {
            Some((previous, at)) => self.formatter.format_report(
                &report,
                Some(previous),
                Some(now.duration_since(*at)),
            ),
            None => self.formatter.format_report(&report, None, None),
        };

        self.previous = Some((report, now));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlushSnapshot, WorkerInfo};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// Provider whose flushed bytes grow by 1 KB on every poll
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicU64,
    }

    impl FlushMetricsProvider for CountingProvider {
        fn flush_report(&self) -> FlushReport {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            FlushReport {
                workers: WorkerInfo {
                    pool_size: 5,
                    ..Default::default()
                },
                flush: FlushSnapshot {
                    dispatched: calls,
                    bytes_flushed: calls * 1024,
                    ..Default::default()
                },
                ..Default::default()
            }
        }
    }

    fn config(format: MetricsFormat) -> MetricsConfig {
        MetricsConfig {
            enabled: true,
            interval: Duration::from_secs(15),
            format,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_includes_rate_after_first_report() {
        let provider = Arc::new(CountingProvider::default());
        let mut reporter = Reporter::new(config(MetricsFormat::Human), provider);

        let first = reporter.render();
        assert!(first.contains("[workers] pool: 5"));
        assert!(!first.contains("/s"));

        tokio::time::advance(Duration::from_secs(1)).await;
        let second = reporter.render();
        assert!(second.contains("1.0 KB/s"), "got: {second}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_json() {
        let provider = Arc::new(CountingProvider::default());
        let mut reporter = Reporter::new(config(MetricsFormat::Json), provider);

        let output = reporter.render();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["flush"]["dispatched"], 1);
    }

    #[tokio::test]
    async fn test_run_disabled() {
        let provider = Arc::new(CountingProvider::default());
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };

        // Returns immediately without polling
        Reporter::new(config, provider.clone())
            .run(CancellationToken::new())
            .await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reports_each_interval_until_cancelled() {
        let provider = Arc::new(CountingProvider::default());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            Reporter::new(config(MetricsFormat::Human), provider.clone()).run(cancel.clone()),
        );

        tokio::time::sleep(Duration::from_secs(46)).await;
        cancel.cancel();
        handle.await.unwrap();

        // Ticks at 0s, 15s, 30s and 45s
        assert!(provider.calls.load(Ordering::SeqCst) >= 3);
    }
}
