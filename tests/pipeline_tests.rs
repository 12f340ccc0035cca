//! End-to-end runs of the test plan against a mock speed test server

use network_speed_tester::{
    client::{Exchange, ExchangeSettings, TimedExchange},
    logging::{LogCapture, LogLevel, Logger},
    models::{Config, TestSpec},
    output::{JsonFormatter, OutputFormatter, PlainFormatter},
    Orchestrator,
};
use std::sync::Arc;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

/// Answers a download with as many bytes as the query asks for
struct SizedDownload;

impl Respond for SizedDownload {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let bytes = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "bytes")
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);
        ResponseTemplate::new(200).set_body_bytes(vec![0u8; bytes])
    }
}

fn small_plan(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        latency_iterations: 3,
        download_tests: vec![TestSpec::new(1_000, 2, "1kB"), TestSpec::new(20_000, 2, "20kB")],
        upload_tests: vec![TestSpec::new(2_000, 2, "2kB")],
        timeout_seconds: 10,
        enable_color: false,
        ..Config::default()
    }
}

fn orchestrator(config: &Config) -> (Orchestrator, LogCapture) {
    let settings = ExchangeSettings::from_config(config).unwrap();
    let (logger, capture) = Logger::capture("TEST");
    let exchange: Arc<dyn Exchange> = Arc::new(TimedExchange::new(settings, logger.named("EXCHANGE")));
    (Orchestrator::new(config.clone(), exchange, logger), capture)
}

async fn mount_downloads(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/__down"))
        .respond_with(SizedDownload)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_run_reports_every_metric() {
    let server = MockServer::start().await;
    mount_downloads(&server).await;
    Mock::given(method("POST"))
        .and(path("/__up"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let config = small_plan(&server);
    let (orchestrator, capture) = orchestrator(&config);
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.trials.len(), 4);
    assert_eq!(report.trials[0].success_count(), 3);

    let summary = &report.summary;
    assert!(summary.start_timestamp > 0);
    assert!(summary.average_latency_ms > 0.0);
    assert!(summary.jitter_ms >= 0.0);
    assert_eq!(summary.average_dns_lookup_ms, 0.0);
    assert_eq!(summary.download.len(), 2);
    assert_eq!(summary.upload.len(), 1);
    assert!(summary.download.iter().all(|m| m.throughput_mbps.is_some()));
    assert!(summary.p90_download_mbps.is_some());
    assert!(summary.p90_upload_mbps.is_some());

    let text = PlainFormatter::new().format_metrics(summary).unwrap();
    let keys: Vec<&str> = text.lines().filter_map(|l| l.split(' ').next()).collect();
    assert_eq!(
        keys,
        vec![
            "cf_start_timestamp",
            "cf_latency_ms",
            "cf_tcp_jitter_ms",
            "cf_dnslookup_ms",
            "cf_1kB_download_latency_ms",
            "cf_1kB_download_Mbps",
            "cf_1kB_download_tcp_jitter",
            "cf_20kB_download_latency_ms",
            "cf_20kB_download_Mbps",
            "cf_20kB_download_tcp_jitter",
            "cf_90th_percentile_download_speed",
            "cf_2kB_upload_latency_ms",
            "cf_2kB_upload_Mbps",
            "cf_2kB_upload_tcp_jitter",
            "cf_90th_percentile_upload_speed",
        ]
    );

    assert_eq!(capture.count(LogLevel::Error), 0);
}

#[tokio::test]
async fn test_failing_uploads_leave_metrics_absent() {
    let server = MockServer::start().await;
    mount_downloads(&server).await;
    Mock::given(method("POST"))
        .and(path("/__up"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = small_plan(&server);
    let (orchestrator, capture) = orchestrator(&config);
    let report = orchestrator.run().await.unwrap();

    let upload = &report.summary.upload[0];
    assert_eq!(upload.samples, 0);
    assert_eq!(upload.attempted, 2);
    assert!(upload.throughput_mbps.is_none());
    assert!(report.summary.p90_upload_mbps.is_none());
    assert!(capture.count(LogLevel::Error) >= 2);

    let json = JsonFormatter::new(false).format_metrics(&report.summary).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["cf_2kB_upload_Mbps"].is_null());
    assert!(value["cf_90th_percentile_upload_speed"].is_null());
    assert!(value["cf_1kB_download_Mbps"].is_number());
}

#[tokio::test]
async fn test_unreachable_baseline_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(path("/__down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = small_plan(&server);
    let (orchestrator, _capture) = orchestrator(&config);
    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(err.category(), "TEST");
    // Only the latency iterations were attempted
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
