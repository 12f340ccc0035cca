//! Configuration data model and validation

use crate::client::ExchangeSettings;
use crate::models::TestSpec;
use crate::types::{AppError, IpFamily, OutputFormat, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the speed test service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Zero-byte downloads issued by the latency trial
    #[serde(default = "default_latency_iterations")]
    pub latency_iterations: u32,

    /// Download trials, ascending payload size
    #[serde(default = "default_download_tests")]
    pub download_tests: Vec<TestSpec>,

    /// Upload trials, ascending payload size
    #[serde(default = "default_upload_tests")]
    pub upload_tests: Vec<TestSpec>,

    /// Skip server certificate verification
    #[serde(default)]
    pub insecure: bool,

    /// PEM file holding a client certificate and its private key
    #[serde(default)]
    pub client_cert: Option<PathBuf>,

    /// Extra request headers as `Name: value`
    #[serde(default)]
    pub headers: Vec<String>,

    #[serde(default)]
    pub ip_family: IpFamily,

    /// Bound on a whole exchange after the connection is established
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub output_format: OutputFormat,

    /// Write metrics here instead of stdout
    #[serde(default)]
    pub output_file: Option<PathBuf>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Emit log entries as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            latency_iterations: default_latency_iterations(),
            download_tests: default_download_tests(),
            upload_tests: default_upload_tests(),
            insecure: false,
            client_cert: None,
            headers: Vec::new(),
            ip_family: IpFamily::default(),
            timeout_seconds: default_timeout_secs(),
            user_agent: default_user_agent(),
            output_format: OutputFormat::default(),
            output_file: None,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            log_json: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Validate the configuration and return the first error found
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(AppError::config("Base URL cannot be empty"));
        }

        let parsed = Url::parse(&self.base_url)
            .map_err(|e| AppError::config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::config(format!(
                "Base URL must use http or https: {}",
                self.base_url
            )));
        }
        if parsed.host_str().is_none() {
            return Err(AppError::config(format!("Base URL has no host: {}", self.base_url)));
        }

        if self.latency_iterations == 0 {
            return Err(AppError::config("Latency count must be greater than 0"));
        }

        if self.latency_iterations > crate::defaults::MAX_LATENCY_ITERATIONS {
            return Err(AppError::config(format!(
                "Latency count cannot exceed {}",
                crate::defaults::MAX_LATENCY_ITERATIONS
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > crate::defaults::MAX_TIMEOUT_SECONDS {
            return Err(AppError::config(format!(
                "Timeout cannot exceed {} seconds",
                crate::defaults::MAX_TIMEOUT_SECONDS
            )));
        }

        for spec in self.download_tests.iter().chain(&self.upload_tests) {
            if spec.iterations == 0 {
                return Err(AppError::config(format!(
                    "Test '{}' must run at least one iteration",
                    spec.label
                )));
            }
            if spec.label.is_empty() {
                return Err(AppError::config("Test label cannot be empty"));
            }
        }

        if let Some(ref cert) = self.client_cert {
            if !cert.is_file() {
                return Err(AppError::config(format!(
                    "Client certificate file not found: {}",
                    cert.display()
                )));
            }
        }

        self.parsed_headers()?;

        Ok(())
    }

    /// Split the `Name: value` header strings
    pub fn parsed_headers(&self) -> Result<Vec<(String, String)>> {
        self.headers
            .iter()
            .map(|header| match header.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    Ok((name.trim().to_string(), value.trim().to_string()))
                }
                _ => Err(AppError::config(format!(
                    "Invalid header '{}': expected 'Name: value'",
                    header
                ))),
            })
            .collect()
    }

    /// `GET` endpoint returning `bytes` bytes
    pub fn download_url(&self, bytes: u64) -> Result<Url> {
        let mut url = self.endpoint(crate::defaults::DOWNLOAD_PATH)?;
        url.query_pairs_mut().append_pair("bytes", &bytes.to_string());
        Ok(url)
    }

    /// `POST` endpoint accepting an upload body
    pub fn upload_url(&self) -> Result<Url> {
        self.endpoint(crate::defaults::UPLOAD_PATH)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        Ok(Url::parse(&joined)?)
    }

    /// Keep only the test specs whose label is listed, in both directions
    pub fn retain_sizes(&mut self, labels: &[String]) -> Result<()> {
        let wanted = |spec: &TestSpec| labels.iter().any(|l| l.eq_ignore_ascii_case(&spec.label));

        if let Some(unknown) = labels.iter().find(|l| {
            !self
                .download_tests
                .iter()
                .chain(&self.upload_tests)
                .any(|spec| l.eq_ignore_ascii_case(&spec.label))
        }) {
            return Err(AppError::config(format!("Unknown test size: {}", unknown)));
        }

        self.download_tests.retain(wanted);
        self.upload_tests.retain(wanted);
        Ok(())
    }

    /// Build the explicit settings handed to each timed exchange
    pub fn exchange_settings(&self) -> Result<ExchangeSettings> {
        ExchangeSettings::from_config(self)
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(base_url) = std::env::var("SPEEDTEST_BASE_URL") {
            self.base_url = base_url.trim().to_string();
        }

        if let Ok(count) = std::env::var("SPEEDTEST_LATENCY_COUNT") {
            self.latency_iterations = count.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid SPEEDTEST_LATENCY_COUNT value '{}': {}", count, e))
            })?;
        }

        if let Ok(insecure) = std::env::var("SPEEDTEST_INSECURE") {
            self.insecure = insecure.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid SPEEDTEST_INSECURE value '{}': {}", insecure, e))
            })?;
        }

        if let Ok(cert) = std::env::var("SPEEDTEST_CLIENT_CERT") {
            if !cert.trim().is_empty() {
                self.client_cert = Some(PathBuf::from(cert.trim()));
            }
        }

        if let Ok(timeout) = std::env::var("SPEEDTEST_TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid SPEEDTEST_TIMEOUT_SECONDS value '{}': {}", timeout, e))
            })?;
        }

        if let Ok(family) = std::env::var("SPEEDTEST_IP_FAMILY") {
            self.ip_family = family.parse().map_err(|e: AppError| {
                AppError::config(format!("Invalid SPEEDTEST_IP_FAMILY value '{}': {}", family, e))
            })?;
        }

        if let Ok(enable_color) = std::env::var("SPEEDTEST_ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse().map_err(|e| {
                AppError::config(format!("Invalid SPEEDTEST_ENABLE_COLOR value '{}': {}", enable_color, e))
            })?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_base_url() -> String {
    crate::defaults::DEFAULT_BASE_URL.to_string()
}

fn default_latency_iterations() -> u32 {
    crate::defaults::DEFAULT_LATENCY_ITERATIONS
}

fn specs(table: &[(u64, u32, &str)]) -> Vec<TestSpec> {
    table
        .iter()
        .map(|&(bytes, iterations, label)| TestSpec::new(bytes, iterations, label))
        .collect()
}

fn default_download_tests() -> Vec<TestSpec> {
    specs(crate::defaults::DEFAULT_DOWNLOAD_TESTS)
}

fn default_upload_tests() -> Vec<TestSpec> {
    specs(crate::defaults::DEFAULT_UPLOAD_TESTS)
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    crate::defaults::DEFAULT_USER_AGENT.to_string()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.latency_iterations, 20);
        assert_eq!(config.download_tests.len(), 3);
        assert_eq!(config.upload_tests.len(), 3);
        assert_eq!(config.ip_family, IpFamily::V4);
    }

    #[test]
    fn test_default_test_plan() {
        let config = Config::default();
        assert_eq!(config.download_tests[0], TestSpec::new(101_000, 10, "100kB"));
        assert_eq!(config.download_tests[2], TestSpec::new(10_001_000, 6, "10MB"));
        assert_eq!(config.upload_tests[0], TestSpec::new(101_000, 8, "100kB"));
        assert_eq!(config.upload_tests[2], TestSpec::new(10_001_000, 4, "10MB"));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.base_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.base_url = "ftp://speed.example.com".to_string();
        assert!(config.validate().is_err());

        config.base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_latency_count_bounds() {
        let mut config = Config::default();
        config.latency_iterations = 0;
        assert!(config.validate().is_err());

        config.latency_iterations = 101;
        assert!(config.validate().is_err());

        config.latency_iterations = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = Config::default();
        config.timeout_seconds = 0;
        assert!(config.validate().is_err());

        config.timeout_seconds = 601;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_iteration_spec_invalid() {
        let mut config = Config::default();
        config.upload_tests[0].iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_cert_invalid() {
        let mut config = Config::default();
        config.client_cert = Some(PathBuf::from("/nonexistent/client.pem"));
        assert!(config.validate().is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "placeholder").unwrap();
        config.client_cert = Some(file.path().to_path_buf());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_header_parsing() {
        let mut config = Config::default();
        config.headers = vec!["Host: speed.example.com".to_string(), "X-Trace:1".to_string()];
        let headers = config.parsed_headers().unwrap();
        assert_eq!(headers[0], ("Host".to_string(), "speed.example.com".to_string()));
        assert_eq!(headers[1], ("X-Trace".to_string(), "1".to_string()));

        config.headers = vec!["missing-colon".to_string()];
        assert!(config.validate().is_err());

        config.headers = vec![": value".to_string()];
        assert!(config.parsed_headers().is_err());
    }

    #[test]
    fn test_endpoint_urls() {
        let mut config = Config::default();
        assert_eq!(
            config.download_url(101_000).unwrap().as_str(),
            "https://speed.cloudflare.com/__down?bytes=101000"
        );
        assert_eq!(
            config.upload_url().unwrap().as_str(),
            "https://speed.cloudflare.com/__up"
        );

        config.base_url = "http://127.0.0.1:8080/".to_string();
        assert_eq!(
            config.download_url(0).unwrap().as_str(),
            "http://127.0.0.1:8080/__down?bytes=0"
        );
    }

    #[test]
    fn test_retain_sizes() {
        let mut config = Config::default();
        config.retain_sizes(&["100kb".to_string(), "1MB".to_string()]).unwrap();
        assert_eq!(config.download_tests.len(), 2);
        assert_eq!(config.upload_tests.len(), 2);

        assert!(config.retain_sizes(&["5GB".to_string()]).is_err());
    }
}
