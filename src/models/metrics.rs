//! Phase timing, per-trial samples and summary metric data models

use crate::error::{AppError, Result};
use crate::types::{Direction, TestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// One payload size to exercise and how often
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    /// Bytes requested from (download) or sent to (upload) the endpoint
    pub payload_bytes: u64,
    /// Number of exchanges in the trial, always greater than zero
    pub iterations: u32,
    /// Label used in metric keys, e.g. `100kB`
    pub label: String,
}

impl TestSpec {
    pub fn new<S: Into<String>>(payload_bytes: u64, iterations: u32, label: S) -> Self {
        Self {
            payload_bytes,
            iterations,
            label: label.into(),
        }
    }
}

/// Instants captured by a phase clock during one exchange
///
/// Any subset may be absent: DNS is skipped for literal addresses and TLS
/// for plain HTTP. Present instants are chronologically ordered as
/// `dns_start ≤ dns_end ≤ connect_start ≤ connect_end ≤ tls_start ≤ tls_end
/// ≤ connection_acquired ≤ first_byte ≤ body_complete`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimestamps {
    pub dns_start: Option<Instant>,
    pub dns_end: Option<Instant>,
    pub connect_start: Option<Instant>,
    pub connect_end: Option<Instant>,
    pub tls_start: Option<Instant>,
    pub tls_end: Option<Instant>,
    pub connection_acquired: Option<Instant>,
    pub first_byte: Option<Instant>,
    pub body_complete: Option<Instant>,
}

impl PhaseTimestamps {
    /// Derive the phase durations of a completed exchange.
    ///
    /// When DNS was skipped, `connect_start` stands in for both DNS
    /// instants, which makes the DNS phase zero. An interval whose end
    /// precedes its start is reported as an error rather than clamped.
    pub fn durations(&self, direction: Direction) -> Result<PhaseDurations> {
        let dns_done = self
            .dns_end
            .or(self.connect_start)
            .ok_or_else(|| missing("dns_end/connect_start"))?;
        let start = self.dns_start.unwrap_or(dns_done);
        let acquired = self
            .connection_acquired
            .ok_or_else(|| missing("connection_acquired"))?;
        let first_byte = self.first_byte.ok_or_else(|| missing("first_byte"))?;
        let body_complete = self
            .body_complete
            .ok_or_else(|| missing("body_complete"))?;

        let tls_handshake = match (self.tls_start, self.tls_end) {
            (Some(tls_start), Some(tls_end)) => Some(span("tls_handshake", tls_start, tls_end)?),
            _ => None,
        };
        let connect = match self.connect_end {
            Some(connect_end) => Some(span("connect", start, connect_end)?),
            None => None,
        };

        let transfer = match direction {
            Direction::Download => span("transfer", first_byte, body_complete)?,
            Direction::Upload => span("transfer", acquired, body_complete)?,
        };

        Ok(PhaseDurations {
            dns_lookup: span("dns_lookup", start, dns_done)?,
            tcp_connect: span("tcp_connect", dns_done, acquired)?,
            tls_handshake,
            connect,
            server_processing: span("server_processing", acquired, first_byte)?,
            transfer,
            total: span("total", start, body_complete)?,
        })
    }
}

fn span(phase: &str, from: Instant, to: Instant) -> Result<Duration> {
    to.checked_duration_since(from).ok_or_else(|| {
        AppError::internal(format!(
            "Phase clock ordering violated: {} ends {:?} before it starts",
            phase,
            from.duration_since(to)
        ))
    })
}

fn missing(which: &str) -> AppError {
    AppError::internal(format!("Phase clock is missing the {} timestamp", which))
}

/// Durations derived from the phase timestamps of a successful exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    /// DNS resolution, zero when the host was a literal address
    pub dns_lookup: Duration,
    /// From the end of DNS until the connection was handed to the request
    pub tcp_connect: Duration,
    /// TLS handshake, only for HTTPS
    pub tls_handshake: Option<Duration>,
    /// From the start of the exchange until the TCP socket was connected
    pub connect: Option<Duration>,
    /// From the connection being acquired until the first response byte
    pub server_processing: Duration,
    /// Payload transfer time, see [`PhaseTimestamps::durations`]
    pub transfer: Duration,
    /// Whole exchange
    pub total: Duration,
}

impl PhaseDurations {
    pub fn dns_ms(&self) -> f64 {
        self.dns_lookup.as_secs_f64() * 1000.0
    }

    pub fn tcp_ms(&self) -> f64 {
        self.tcp_connect.as_secs_f64() * 1000.0
    }

    pub fn tls_ms(&self) -> Option<f64> {
        self.tls_handshake.map(|d| d.as_secs_f64() * 1000.0)
    }

    pub fn server_ms(&self) -> f64 {
        self.server_processing.as_secs_f64() * 1000.0
    }

    pub fn transfer_ms(&self) -> f64 {
        self.transfer.as_secs_f64() * 1000.0
    }

    pub fn total_ms(&self) -> f64 {
        self.total.as_secs_f64() * 1000.0
    }
}

/// Result of one timed request/response exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeOutcome {
    pub status: TestStatus,
    /// HTTP status, when a response head was received
    pub status_code: Option<u16>,
    /// Present only for successful exchanges
    pub durations: Option<PhaseDurations>,
    /// Payload bytes moved in the measured direction
    pub bytes_transferred: u64,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExchangeOutcome {
    /// Create a successful outcome
    pub fn success(status_code: u16, durations: PhaseDurations, bytes_transferred: u64) -> Self {
        Self {
            status: TestStatus::Success,
            status_code: Some(status_code),
            durations: Some(durations),
            bytes_transferred,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a failed outcome from the error that ended the exchange
    pub fn failed(error: &AppError, status_code: Option<u16>) -> Self {
        let status = match error {
            AppError::Timeout(_) => TestStatus::Timeout,
            _ => TestStatus::Failed,
        };
        Self {
            status,
            status_code,
            durations: None,
            bytes_transferred: 0,
            error_message: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status == TestStatus::Success && self.durations.is_some()
    }
}

/// Samples collected by one trial, one entry per successful iteration
///
/// The five sequences are parallel: index `i` of each belongs to the same
/// exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub label: String,
    pub payload_bytes: u64,
    pub direction: Direction,
    /// Iterations issued, successful or not
    pub attempted: u32,
    pub total: Vec<Duration>,
    pub server_processing: Vec<Duration>,
    pub tcp_connect: Vec<Duration>,
    pub dns_lookup: Vec<Duration>,
    pub transfer: Vec<Duration>,
}

impl TrialResult {
    pub fn new(spec: &TestSpec, direction: Direction) -> Self {
        let capacity = spec.iterations as usize;
        Self {
            label: spec.label.clone(),
            payload_bytes: spec.payload_bytes,
            direction,
            attempted: 0,
            total: Vec::with_capacity(capacity),
            server_processing: Vec::with_capacity(capacity),
            tcp_connect: Vec::with_capacity(capacity),
            dns_lookup: Vec::with_capacity(capacity),
            transfer: Vec::with_capacity(capacity),
        }
    }

    /// Append the durations of a successful iteration
    pub fn record(&mut self, durations: &PhaseDurations) {
        self.total.push(durations.total);
        self.server_processing.push(durations.server_processing);
        self.tcp_connect.push(durations.tcp_connect);
        self.dns_lookup.push(durations.dns_lookup);
        self.transfer.push(durations.transfer);
    }

    pub fn success_count(&self) -> usize {
        self.total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }

    /// Success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            (self.success_count() as f64 / self.attempted as f64) * 100.0
        }
    }
}

/// Metrics of one payload size; each value is absent when the trial had no
/// successful iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeMetrics {
    pub label: String,
    pub payload_bytes: u64,
    pub latency_ms: Option<f64>,
    pub throughput_mbps: Option<f64>,
    pub tcp_jitter_ms: Option<f64>,
    pub samples: usize,
    pub attempted: u32,
}

/// Unit of an emitted metric, drives its text rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    /// Seconds since the Unix epoch, printed as an integer
    Timestamp,
    Milliseconds,
    Mbps,
}

/// One `(key, value)` pair of the run summary
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPair {
    pub key: String,
    pub value: Option<f64>,
    pub unit: MetricUnit,
}

impl MetricPair {
    fn new(key: String, value: Option<f64>, unit: MetricUnit) -> Self {
        Self { key, value, unit }
    }
}

/// Everything a run reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    /// Unix seconds at which the run started
    pub start_timestamp: i64,
    /// Mean TCP connect time of the latency trial
    pub average_latency_ms: f64,
    /// Jitter of the TCP connect times of the latency trial
    pub jitter_ms: f64,
    pub average_dns_lookup_ms: f64,
    pub download: Vec<SizeMetrics>,
    pub upload: Vec<SizeMetrics>,
    pub p90_download_mbps: Option<f64>,
    pub p90_upload_mbps: Option<f64>,
}

impl SummaryMetrics {
    /// Flatten into stable metric keys, in emission order
    pub fn to_pairs(&self) -> Vec<MetricPair> {
        let mut pairs = vec![
            MetricPair::new(
                "cf_start_timestamp".to_string(),
                Some(self.start_timestamp as f64),
                MetricUnit::Timestamp,
            ),
            MetricPair::new(
                "cf_latency_ms".to_string(),
                Some(self.average_latency_ms),
                MetricUnit::Milliseconds,
            ),
            MetricPair::new(
                "cf_tcp_jitter_ms".to_string(),
                Some(self.jitter_ms),
                MetricUnit::Milliseconds,
            ),
            MetricPair::new(
                "cf_dnslookup_ms".to_string(),
                Some(self.average_dns_lookup_ms),
                MetricUnit::Milliseconds,
            ),
        ];

        push_direction(&mut pairs, Direction::Download, &self.download, self.p90_download_mbps);
        push_direction(&mut pairs, Direction::Upload, &self.upload, self.p90_upload_mbps);
        pairs
    }
}

fn push_direction(
    pairs: &mut Vec<MetricPair>,
    direction: Direction,
    sizes: &[SizeMetrics],
    p90: Option<f64>,
) {
    for size in sizes {
        let prefix = format!("cf_{}_{}", size.label, direction);
        pairs.push(MetricPair::new(
            format!("{}_latency_ms", prefix),
            size.latency_ms,
            MetricUnit::Milliseconds,
        ));
        pairs.push(MetricPair::new(
            format!("{}_Mbps", prefix),
            size.throughput_mbps,
            MetricUnit::Mbps,
        ));
        pairs.push(MetricPair::new(
            format!("{}_tcp_jitter", prefix),
            size.tcp_jitter_ms,
            MetricUnit::Milliseconds,
        ));
    }
    pairs.push(MetricPair::new(
        format!("cf_90th_percentile_{}_speed", direction),
        p90,
        MetricUnit::Mbps,
    ));
}
