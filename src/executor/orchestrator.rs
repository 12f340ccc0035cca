//! Whole-run orchestration: latency baseline, download and upload trials,
//! reduction to summary metrics

use super::TrialRunner;
use crate::{
    client::Exchange,
    error::{AppError, Result},
    logging::Logger,
    models::{Config, SizeMetrics, SummaryMetrics, TestSpec, TrialResult},
    stats::{durations_to_ms, SpeedCalculator, StatisticsEngine},
    types::Direction,
};
use chrono::Utc;
use std::sync::Arc;

/// Label of the latency baseline trial
pub const LATENCY_LABEL: &str = "latency";

/// Summary plus the raw trials it was computed from
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: SummaryMetrics,
    /// Latency trial first, then downloads, then uploads
    pub trials: Vec<TrialResult>,
}

/// Drives the configured test plan
pub struct Orchestrator {
    config: Config,
    runner: TrialRunner,
    logger: Logger,
}

impl Orchestrator {
    pub fn new(config: Config, exchange: Arc<dyn Exchange>, logger: Logger) -> Self {
        let runner = TrialRunner::new(exchange, logger.named("TRIAL"));
        Self {
            config,
            runner,
            logger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full plan.
    ///
    /// Fails only when the latency baseline has no successful sample; a size
    /// trial without samples leaves that size's metrics absent.
    pub async fn run(&self) -> Result<RunReport> {
        let start_timestamp = Utc::now().timestamp();
        let operation = self.logger.start_operation("speed_test").await;
        let mut trials = Vec::new();

        let latency_spec = TestSpec::new(0, self.config.latency_iterations, LATENCY_LABEL);
        let latency_trial = self
            .runner
            .run_trials(&latency_spec, Direction::Download, &self.config.download_url(0)?)
            .await;

        if latency_trial.is_empty() {
            let error = AppError::test_execution(format!(
                "Latency test against {} produced no successful samples out of {}",
                self.config.base_url, latency_trial.attempted
            ));
            self.logger
                .fatal("Latency baseline unavailable, aborting the run")
                .trial(&latency_trial)
                .error_info(&error)
                .log()
                .await;
            self.logger
                .end_operation(&operation, "speed_test", false)
                .await;
            return Err(error);
        }

        let tcp_ms = durations_to_ms(&latency_trial.tcp_connect);
        let average_latency_ms = StatisticsEngine::mean(&tcp_ms)?;
        let jitter_ms = StatisticsEngine::jitter(&tcp_ms)?;
        let average_dns_lookup_ms = StatisticsEngine::mean(&durations_to_ms(&latency_trial.dns_lookup))?;
        trials.push(latency_trial);

        self.logger
            .info("Latency baseline measured")
            .field("latency_ms", average_latency_ms)
            .field("jitter_ms", jitter_ms)
            .field("dns_lookup_ms", average_dns_lookup_ms)
            .log()
            .await;

        let download = self
            .run_direction(Direction::Download, &self.config.download_tests, &mut trials)
            .await?;
        let upload = self
            .run_direction(Direction::Upload, &self.config.upload_tests, &mut trials)
            .await?;

        let summary = SummaryMetrics {
            start_timestamp,
            average_latency_ms,
            jitter_ms,
            average_dns_lookup_ms,
            p90_download_mbps: p90_throughput(&download),
            p90_upload_mbps: p90_throughput(&upload),
            download,
            upload,
        };

        self.logger.end_operation(&operation, "speed_test", true).await;
        Ok(RunReport { summary, trials })
    }

    /// Run every trial of one direction in ascending payload order
    async fn run_direction(
        &self,
        direction: Direction,
        specs: &[TestSpec],
        trials: &mut Vec<TrialResult>,
    ) -> Result<Vec<SizeMetrics>> {
        let mut specs = specs.to_vec();
        specs.sort_by_key(|spec| spec.payload_bytes);

        let mut metrics = Vec::with_capacity(specs.len());
        for spec in &specs {
            let url = match direction {
                Direction::Download => self.config.download_url(spec.payload_bytes)?,
                Direction::Upload => self.config.upload_url()?,
            };
            let trial = self.runner.run_trials(spec, direction, &url).await;
            metrics.push(self.size_metrics(&trial).await);
            trials.push(trial);
        }
        Ok(metrics)
    }

    async fn size_metrics(&self, trial: &TrialResult) -> SizeMetrics {
        let mut metrics = SizeMetrics {
            label: trial.label.clone(),
            payload_bytes: trial.payload_bytes,
            latency_ms: None,
            throughput_mbps: None,
            tcp_jitter_ms: None,
            samples: trial.success_count(),
            attempted: trial.attempted,
        };

        if trial.is_empty() {
            self.logger
                .warn(&format!(
                    "No successful {} iterations for {}; its metrics are omitted",
                    trial.direction, trial.label
                ))
                .field("attempted", trial.attempted)
                .log()
                .await;
            return metrics;
        }

        metrics.latency_ms = StatisticsEngine::mean(&durations_to_ms(&trial.total)).ok();
        metrics.tcp_jitter_ms = StatisticsEngine::jitter(&durations_to_ms(&trial.tcp_connect)).ok();
        metrics.throughput_mbps = match SpeedCalculator::mean_throughput_mbps(trial.payload_bytes, &trial.transfer) {
            Ok(mbps) => Some(mbps),
            Err(e) => {
                self.logger
                    .warn(&format!("Throughput unavailable for {} {}: {}", trial.label, trial.direction, e))
                    .log()
                    .await;
                None
            }
        };
        metrics
    }
}

/// 90th percentile over the sizes that produced a throughput
fn p90_throughput(sizes: &[SizeMetrics]) -> Option<f64> {
    let speeds: Vec<f64> = sizes.iter().filter_map(|s| s.throughput_mbps).collect();
    StatisticsEngine::percentile(&speeds, 90.0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::{phases, ScriptedExchange};
    use crate::logging::LogLevel;
    use crate::models::ExchangeOutcome;

    fn plan() -> Config {
        Config {
            latency_iterations: 2,
            download_tests: vec![TestSpec::new(1_000_000, 1, "1MB"), TestSpec::new(100_000, 2, "100kB")],
            upload_tests: vec![TestSpec::new(100_000, 1, "100kB")],
            ..Config::default()
        }
    }

    fn ok(tcp_ms: u64, server_ms: u64, transfer_ms: u64) -> ExchangeOutcome {
        ExchangeOutcome::success(200, phases(tcp_ms, server_ms, transfer_ms), 0)
    }

    fn failed() -> ExchangeOutcome {
        ExchangeOutcome::failed(&AppError::network("connection reset"), None)
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map_or(false, |a| (a - b).abs() < 1e-9)
    }

    #[tokio::test]
    async fn test_full_plan() {
        let exchange = Arc::new(ScriptedExchange::new(vec![
            // latency
            ok(10, 1, 0),
            ok(20, 1, 0),
            // 100kB download, run first despite its position in the plan
            ok(10, 10, 100),
            ok(10, 10, 100),
            // 1MB download
            ok(10, 10, 1000),
            // 100kB upload
            ok(10, 10, 200),
        ]));
        let (logger, _capture) = Logger::capture("ORCH");
        let orchestrator = Orchestrator::new(plan(), exchange.clone(), logger);

        let report = orchestrator.run().await.unwrap();
        let summary = &report.summary;

        assert!((summary.average_latency_ms - 15.0).abs() < 1e-9);
        assert!((summary.jitter_ms - 50f64.sqrt()).abs() < 1e-9);
        assert_eq!(summary.average_dns_lookup_ms, 0.0);

        assert_eq!(summary.download[0].label, "100kB");
        assert!(approx(summary.download[0].latency_ms, 120.0));
        assert!(approx(summary.download[0].throughput_mbps, 8.0));
        assert!(approx(summary.download[0].tcp_jitter_ms, 0.0));
        assert_eq!(summary.download[1].label, "1MB");
        assert!(approx(summary.download[1].throughput_mbps, 8.0));
        assert!(approx(summary.download[1].tcp_jitter_ms, 0.0));

        assert!(approx(summary.upload[0].throughput_mbps, 4.0));
        assert!(approx(summary.p90_download_mbps, 8.0));
        assert!(approx(summary.p90_upload_mbps, 4.0));

        assert_eq!(report.trials.len(), 4);
        assert_eq!(report.trials[0].label, LATENCY_LABEL);

        let seen = exchange.seen();
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0].payload_bytes, 0);
        assert_eq!(seen[0].url.as_str(), "https://speed.cloudflare.com/__down?bytes=0");
        assert_eq!(seen[2].url.as_str(), "https://speed.cloudflare.com/__down?bytes=100000");
        assert_eq!(seen[5].url.as_str(), "https://speed.cloudflare.com/__up");
        assert_eq!(seen[5].direction, Direction::Upload);
    }

    #[tokio::test]
    async fn test_empty_latency_baseline_aborts() {
        let exchange = Arc::new(ScriptedExchange::new(vec![failed(), failed()]));
        let (logger, capture) = Logger::capture("ORCH");
        let orchestrator = Orchestrator::new(plan(), exchange.clone(), logger);

        let err = orchestrator.run().await.unwrap_err();
        assert_eq!(err.category(), "TEST");
        assert_eq!(capture.count(LogLevel::Fatal), 1);
        // no size trial is attempted
        assert_eq!(exchange.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_size_trial_leaves_metrics_absent() {
        let exchange = Arc::new(ScriptedExchange::new(vec![
            ok(10, 1, 0),
            ok(10, 1, 0),
            // 100kB download fails twice
            failed(),
            failed(),
            ok(10, 10, 1000),
            failed(),
        ]));
        let (logger, capture) = Logger::capture("ORCH");
        let orchestrator = Orchestrator::new(plan(), exchange, logger);

        let summary = orchestrator.run().await.unwrap().summary;

        let small = &summary.download[0];
        assert_eq!(small.samples, 0);
        assert_eq!(small.attempted, 2);
        assert!(small.latency_ms.is_none());
        assert!(small.throughput_mbps.is_none());
        assert!(small.tcp_jitter_ms.is_none());

        assert!(approx(summary.p90_download_mbps, 8.0));
        assert!(summary.p90_upload_mbps.is_none());
        assert!(summary.upload[0].throughput_mbps.is_none());

        assert_eq!(capture.count(LogLevel::Warn), 2);
    }

    #[tokio::test]
    async fn test_single_latency_sample_has_zero_jitter() {
        let config = Config {
            latency_iterations: 1,
            download_tests: vec![],
            upload_tests: vec![],
            ..Config::default()
        };
        let exchange = Arc::new(ScriptedExchange::new(vec![ok(42, 1, 0)]));
        let (logger, _capture) = Logger::capture("ORCH");

        let summary = Orchestrator::new(config, exchange, logger).run().await.unwrap().summary;

        assert!((summary.average_latency_ms - 42.0).abs() < 1e-9);
        assert_eq!(summary.jitter_ms, 0.0);
        assert!(summary.download.is_empty());
        assert!(summary.p90_download_mbps.is_none());
        assert_eq!(summary.to_pairs().len(), 6);
    }

    #[test]
    fn test_p90_over_available_speeds() {
        let size = |mbps: Option<f64>| SizeMetrics {
            label: "x".into(),
            payload_bytes: 1,
            latency_ms: None,
            throughput_mbps: mbps,
            tcp_jitter_ms: None,
            samples: 0,
            attempted: 0,
        };
        assert!(p90_throughput(&[]).is_none());
        assert!(p90_throughput(&[size(None)]).is_none());

        let p90 = p90_throughput(&[size(Some(10.0)), size(None), size(Some(20.0)), size(Some(30.0))]).unwrap();
        assert!((p90 - 28.0).abs() < 1e-9);
    }
}
