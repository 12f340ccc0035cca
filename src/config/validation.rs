//! Configuration validation beyond hard errors: settings that are legal but
//! likely to skew or slow the measurement

use crate::{
    error::{AppError, Result},
    models::Config,
    types::IpFamily,
};
use colored::Colorize;
use std::net::IpAddr;

/// Configuration validator with advanced validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run `Config::validate` and collect the non-fatal warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_base_url(config)?);
        warnings.extend(Self::validate_transport_settings(config));
        warnings.extend(Self::validate_test_plan(config));

        Ok(warnings)
    }

    fn validate_base_url(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();
        let url = &config.base_url;
        let parsed = url::Url::parse(url)
            .map_err(|e| AppError::config(format!("Invalid base URL '{}': {}", url, e)))?;

        if parsed.scheme() == "http" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Base URL '{}' uses HTTP; no TLS handshake will be measured", url),
            ));
        }

        if let Some(port) = parsed.port() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Base URL '{}' uses non-standard port {}", url, port),
            ));
        }

        let literal = match parsed.host() {
            Some(url::Host::Ipv4(ip)) => Some(IpAddr::V4(ip)),
            Some(url::Host::Ipv6(ip)) => Some(IpAddr::V6(ip)),
            _ => None,
        };
        if let Some(ip) = literal {
            if is_private_or_local(&ip) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Base URL '{}' targets a private or local network", url),
                ));
            }
            if !config.ip_family.allows(&ip) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "Base URL host {} is not reachable with IP family {}; every exchange will fail",
                        ip, config.ip_family
                    ),
                ));
            }
        }

        if !parsed.path().is_empty() && parsed.path() != "/" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Base URL '{}' includes path '{}'; endpoints are appended to it",
                    url,
                    parsed.path()
                ),
            ));
        }

        Ok(warnings)
    }

    fn validate_transport_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.insecure {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Server certificate verification is disabled".to_string(),
            ));
        }

        if config.timeout_seconds < 10 && config.download_tests.iter().any(|t| t.payload_bytes >= 10_000_000) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Timeout of {}s may be too short for the largest transfers",
                    config.timeout_seconds
                ),
            ));
        }

        if config.ip_family == IpFamily::Any {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "IP family 'any' may mix IPv4 and IPv6 paths across iterations".to_string(),
            ));
        }

        warnings
    }

    fn validate_test_plan(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.latency_iterations < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Latency count of {} may not provide reliable jitter (recommended: >= 3)",
                    config.latency_iterations
                ),
            ));
        }

        if config.download_tests.is_empty() && config.upload_tests.is_empty() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "No download or upload sizes selected; only latency will be measured".to_string(),
            ));
        }

        let bytes: u64 = config
            .download_tests
            .iter()
            .chain(&config.upload_tests)
            .map(|t| t.payload_bytes * t.iterations as u64)
            .sum();
        if bytes > 500_000_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Test plan transfers about {} MB in total", bytes / 1_000_000),
            ));
        }

        warnings
    }
}

fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if !use_color {
            return format!("{} {}", tag, self.message);
        }
        let tag = match self.level {
            ValidationLevel::Info => tag.blue(),
            ValidationLevel::Warning => tag.yellow().bold(),
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
