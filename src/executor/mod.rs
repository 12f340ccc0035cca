//! Test execution engine
//!
//! This module contains the two execution layers:
//! - [`TrialRunner`] repeats one exchange a fixed number of times and keeps
//!   the phase durations of the successful iterations
//! - [`Orchestrator`] runs the whole plan (latency baseline, downloads,
//!   uploads) and reduces the trials to a
//!   [`SummaryMetrics`](crate::models::SummaryMetrics)
//!
//! Everything runs sequentially; at most one exchange is in flight.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, RunReport};

use crate::{
    client::{Exchange, ExchangeRequest},
    logging::Logger,
    models::{TestSpec, TrialResult},
    types::Direction,
};
use std::sync::Arc;
use url::Url;

/// Runs the iterations of a single trial
#[derive(Clone)]
pub struct TrialRunner {
    exchange: Arc<dyn Exchange>,
    logger: Logger,
}

impl TrialRunner {
    pub fn new(exchange: Arc<dyn Exchange>, logger: Logger) -> Self {
        Self { exchange, logger }
    }

    /// Issue `spec.iterations` exchanges against `url` one after another.
    ///
    /// Failed iterations are skipped: they add nothing to the sample
    /// sequences and are never retried. A trial in which every iteration
    /// fails yields empty sequences.
    pub async fn run_trials(&self, spec: &TestSpec, direction: Direction, url: &Url) -> TrialResult {
        let mut trial = TrialResult::new(spec, direction);
        let request = match direction {
            Direction::Download => ExchangeRequest::download(url.clone(), spec.payload_bytes),
            Direction::Upload => ExchangeRequest::upload(url.clone(), spec.payload_bytes),
        };

        for _ in 0..spec.iterations {
            trial.attempted += 1;
            let outcome = self.exchange.run(&request).await;
            if !outcome.is_successful() {
                continue;
            }
            if let Some(durations) = &outcome.durations {
                trial.record(durations);
            }
        }

        self.logger
            .info(&format!(
                "{} {} trial: {}/{} iterations succeeded",
                spec.label, direction, trial.success_count(), trial.attempted
            ))
            .trial(&trial)
            .log()
            .await;

        trial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::logging::LogLevel;
    use crate::models::{ExchangeOutcome, PhaseDurations};
    use crate::stats::{durations_to_ms, SpeedCalculator, StatisticsEngine};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays a fixed list of outcomes and records the requests it saw
    pub(crate) struct ScriptedExchange {
        outcomes: Mutex<VecDeque<ExchangeOutcome>>,
        seen: Mutex<Vec<ExchangeRequest>>,
    }

    impl ScriptedExchange {
        pub(crate) fn new(outcomes: Vec<ExchangeOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn seen(&self) -> Vec<ExchangeRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Exchange for ScriptedExchange {
        async fn run(&self, request: &ExchangeRequest) -> ExchangeOutcome {
            self.seen.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ExchangeOutcome::failed(&AppError::network("script exhausted"), None))
        }
    }

    pub(crate) fn phases(tcp_ms: u64, server_ms: u64, transfer_ms: u64) -> PhaseDurations {
        PhaseDurations {
            dns_lookup: Duration::ZERO,
            tcp_connect: Duration::from_millis(tcp_ms),
            tls_handshake: None,
            connect: Some(Duration::from_millis(tcp_ms)),
            server_processing: Duration::from_millis(server_ms),
            transfer: Duration::from_millis(transfer_ms),
            total: Duration::from_millis(tcp_ms + server_ms + transfer_ms),
        }
    }

    fn ok(durations: PhaseDurations) -> ExchangeOutcome {
        ExchangeOutcome::success(200, durations, 0)
    }

    fn failed() -> ExchangeOutcome {
        ExchangeOutcome::failed(&AppError::status(503, "http://x/"), Some(503))
    }

    fn url() -> Url {
        Url::parse("https://speed.cloudflare.com/__down?bytes=100000").unwrap()
    }

    #[tokio::test]
    async fn test_all_iterations_fail() {
        let exchange = Arc::new(ScriptedExchange::new(vec![failed(), failed(), failed()]));
        let (logger, _capture) = Logger::capture("TRIAL");
        let runner = TrialRunner::new(exchange, logger);

        let trial = runner
            .run_trials(&TestSpec::new(100_000, 3, "100kB"), Direction::Download, &url())
            .await;

        assert!(trial.is_empty());
        assert_eq!(trial.attempted, 3);
        assert!(trial.tcp_connect.is_empty());
        assert!(trial.transfer.is_empty());
    }

    #[tokio::test]
    async fn test_failed_iterations_are_skipped() {
        let exchange = Arc::new(ScriptedExchange::new(vec![
            failed(),
            ok(phases(10, 5, 20)),
            failed(),
            ok(phases(12, 6, 22)),
            failed(),
        ]));
        let (logger, capture) = Logger::capture("TRIAL");
        let runner = TrialRunner::new(exchange.clone(), logger);

        let trial = runner
            .run_trials(&TestSpec::new(100_000, 5, "100kB"), Direction::Download, &url())
            .await;

        assert_eq!(trial.success_count(), 2);
        assert_eq!(trial.attempted, 5);
        assert_eq!(
            trial.tcp_connect,
            vec![Duration::from_millis(10), Duration::from_millis(12)]
        );
        assert_eq!(trial.total, vec![Duration::from_millis(35), Duration::from_millis(40)]);
        assert_eq!(exchange.seen().len(), 5);

        let summary = capture
            .entries()
            .into_iter()
            .find(|e| e.level == LogLevel::Info)
            .unwrap();
        assert!(summary.message.contains("2/5"));
    }

    #[tokio::test]
    async fn test_trial_feeds_throughput() {
        // 1 MB over 1 s on every iteration is 8 Mbps
        let exchange = Arc::new(ScriptedExchange::new(vec![
            ok(phases(10, 40, 1000)),
            ok(phases(20, 40, 1000)),
        ]));
        let (logger, _capture) = Logger::capture("TRIAL");
        let runner = TrialRunner::new(exchange, logger);

        let trial = runner
            .run_trials(&TestSpec::new(1_000_000, 2, "1MB"), Direction::Download, &url())
            .await;

        let mbps = SpeedCalculator::mean_throughput_mbps(trial.payload_bytes, &trial.transfer).unwrap();
        assert!((mbps - 8.0).abs() < 1e-9);

        let latency = StatisticsEngine::mean(&durations_to_ms(&trial.tcp_connect)).unwrap();
        assert!((latency - 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_default_download_size_latency_and_speed() {
        // 100 kB, 50 ms server time and 100 ms transfer on each of 8 iterations
        let exchange = Arc::new(ScriptedExchange::new(
            (0..8).map(|_| ok(phases(0, 50, 100))).collect(),
        ));
        let (logger, _capture) = Logger::capture("TRIAL");
        let runner = TrialRunner::new(exchange.clone(), logger);

        let trial = runner
            .run_trials(&TestSpec::new(100_000, 8, "100kB"), Direction::Download, &url())
            .await;

        assert_eq!(trial.success_count(), 8);
        assert_eq!(exchange.seen().len(), 8);

        let latency = StatisticsEngine::mean(&durations_to_ms(&trial.total)).unwrap();
        assert!((latency - 150.0).abs() < 1e-9);

        let mbps = SpeedCalculator::mean_throughput_mbps(trial.payload_bytes, &trial.transfer).unwrap();
        assert!((mbps - 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_upload_requests_carry_payload_size() {
        let exchange = Arc::new(ScriptedExchange::new(vec![ok(phases(1, 1, 1))]));
        let (logger, _capture) = Logger::capture("TRIAL");
        let runner = TrialRunner::new(exchange.clone(), logger);
        let upload_url = Url::parse("https://speed.cloudflare.com/__up").unwrap();

        let trial = runner
            .run_trials(&TestSpec::new(101_000, 1, "100kB"), Direction::Upload, &upload_url)
            .await;

        assert_eq!(trial.direction, Direction::Upload);
        let seen = exchange.seen();
        assert_eq!(seen[0].direction, Direction::Upload);
        assert_eq!(seen[0].payload_bytes, 101_000);
        assert_eq!(seen[0].url, upload_url);
    }

    #[tokio::test]
    async fn test_zero_iterations() {
        let exchange = Arc::new(ScriptedExchange::new(vec![]));
        let (logger, _capture) = Logger::capture("TRIAL");
        let runner = TrialRunner::new(exchange.clone(), logger);

        let trial = runner
            .run_trials(&TestSpec::new(0, 0, "latency"), Direction::Download, &url())
            .await;

        assert!(trial.is_empty());
        assert_eq!(trial.attempted, 0);
        assert!(exchange.seen().is_empty());
    }
}
