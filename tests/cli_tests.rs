//! Command-line behaviour of the `nst` binary
//!
//! Every command runs in an empty temporary directory with the
//! `SPEEDTEST_*` variables removed, so neither a local `.env` file nor the
//! caller's environment can leak into the run.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

const ENV_VARS: &[&str] = &[
    "SPEEDTEST_BASE_URL",
    "SPEEDTEST_LATENCY_COUNT",
    "SPEEDTEST_INSECURE",
    "SPEEDTEST_CLIENT_CERT",
    "SPEEDTEST_TIMEOUT_SECONDS",
    "SPEEDTEST_IP_FAMILY",
    "SPEEDTEST_ENABLE_COLOR",
];

fn nst(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nst").unwrap();
    cmd.current_dir(dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

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

async fn speed_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__down"))
        .respond_with(SizedDownload)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/__up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_version_and_help() {
    let dir = TempDir::new().unwrap();

    nst(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));

    nst(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--latency-count"))
        .stdout(predicate::str::contains("--sizes"));
}

#[test]
fn test_invalid_arguments_rejected() {
    let dir = TempDir::new().unwrap();

    nst(&dir).args(["--latency-count", "0"]).assert().failure();
    nst(&dir).args(["--latency-count", "101"]).assert().failure();
    nst(&dir).args(["--timeout", "abc"]).assert().failure();
    nst(&dir).args(["--ipv4", "--ipv6"]).assert().failure();
    nst(&dir).args(["--format", "xml"]).assert().failure();
}

#[test]
fn test_conflicting_color_flags() {
    let dir = TempDir::new().unwrap();
    nst(&dir)
        .args(["--color", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--no-color"));
}

#[test]
fn test_bad_configuration_fails_before_any_request() {
    let dir = TempDir::new().unwrap();

    nst(&dir)
        .args(["--no-color", "--base-url", "ftp://speed.example.com"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[CONFIG]"));

    nst(&dir)
        .args(["--no-color", "--cert", "/nonexistent/client.pem"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Client certificate file not found"));

    nst(&dir)
        .args(["--no-color", "--sizes", "5GB"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown test size"));
}

#[test]
fn test_invalid_env_file_value() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "SPEEDTEST_LATENCY_COUNT=many\n").unwrap();

    nst(&dir)
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SPEEDTEST_LATENCY_COUNT"));
}

#[test]
fn test_write_env_example() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("example.env");

    nst(&dir)
        .arg("--write-env-example")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = fs::read_to_string(&target).unwrap();
    for var in ENV_VARS {
        assert!(content.contains(var), "missing {}", var);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_text_run_against_mock_server() {
    let server = speed_server().await;
    let dir = TempDir::new().unwrap();

    nst(&dir)
        .args(["--no-color", "--latency-count", "2", "--sizes", "100kB"])
        .arg("--base-url")
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("cf_start_timestamp "))
        .stdout(predicate::str::contains("cf_100kB_download_Mbps "))
        .stdout(predicate::str::contains("cf_100kB_upload_Mbps "))
        .stdout(predicate::str::contains("cf_1MB_").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_json_run_written_to_file() {
    let server = speed_server().await;
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("metrics.json");

    nst(&dir)
        .args(["--latency-count", "2", "--sizes", "100kB", "--format", "json"])
        .arg("--base-url")
        .arg(server.uri())
        .arg("--output")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert!(value["cf_start_timestamp"].is_i64());
    assert!(value["cf_100kB_download_Mbps"].is_number());
    assert!(value["cf_90th_percentile_upload_speed"].is_number());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_verbose_tables_go_to_stderr() {
    let server = speed_server().await;
    let dir = TempDir::new().unwrap();

    nst(&dir)
        .args(["--no-color", "--verbose", "--latency-count", "2", "--sizes", "100kB"])
        .arg("--base-url")
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("PHASE TIMING BREAKDOWN").not())
        .stderr(predicate::str::contains("PHASE TIMING BREAKDOWN"));
}
