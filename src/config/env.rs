//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::IpFamily;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the working directory if it exists. Returns whether a
    /// file was loaded. Variables already set in the environment win.
    pub fn load_env_file() -> Result<bool> {
        if !Path::new(".env").exists() {
            return Ok(false);
        }

        dotenv::from_filename(".env")
            .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;
        Ok(true)
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Network Speed Tester Configuration
#
# Values here are used as defaults and can be overridden by variables set in
# the environment and by command-line arguments.

# Base URL of the speed test server
# SPEEDTEST_BASE_URL=https://speed.cloudflare.com

# Iterations of the latency test (1-100)
# SPEEDTEST_LATENCY_COUNT=20

# Skip server certificate verification (true/false)
# SPEEDTEST_INSECURE=false

# PEM file holding a client certificate and its private key
# SPEEDTEST_CLIENT_CERT=/path/to/client.pem

# Per-request timeout in seconds (1-600)
# SPEEDTEST_TIMEOUT_SECONDS=120

# Address family: ipv4, ipv6 or any
# SPEEDTEST_IP_FAMILY=ipv4

# Enable colored output (true/false)
# SPEEDTEST_ENABLE_COLOR=true

# Example configurations for different scenarios:
#
# Self-hosted endpoint behind a private CA, client certificate required:
# SPEEDTEST_BASE_URL=https://speed.internal.example.com
# SPEEDTEST_CLIENT_CERT=/etc/speedtest/client.pem
#
# Quick check on a slow link:
# SPEEDTEST_LATENCY_COUNT=5
# SPEEDTEST_TIMEOUT_SECONDS=30
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "SPEEDTEST_BASE_URL" => {
                let parsed = url::Url::parse(value.trim()).map_err(|e| {
                    AppError::config(format!("Invalid SPEEDTEST_BASE_URL '{}': {}", value, e))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AppError::config(format!(
                        "SPEEDTEST_BASE_URL must use http or https: {}",
                        value
                    )));
                }
            }
            "SPEEDTEST_LATENCY_COUNT" => {
                let count: u32 = value.trim().parse().map_err(|e| {
                    AppError::config(format!("Invalid SPEEDTEST_LATENCY_COUNT value '{}': {}", value, e))
                })?;
                if count == 0 || count > crate::defaults::MAX_LATENCY_ITERATIONS {
                    return Err(AppError::config(format!(
                        "SPEEDTEST_LATENCY_COUNT must be between 1 and {}, got: {}",
                        crate::defaults::MAX_LATENCY_ITERATIONS,
                        count
                    )));
                }
            }
            "SPEEDTEST_TIMEOUT_SECONDS" => {
                let timeout: u64 = value.trim().parse().map_err(|e| {
                    AppError::config(format!("Invalid SPEEDTEST_TIMEOUT_SECONDS value '{}': {}", value, e))
                })?;
                if timeout == 0 || timeout > crate::defaults::MAX_TIMEOUT_SECONDS {
                    return Err(AppError::config(format!(
                        "SPEEDTEST_TIMEOUT_SECONDS must be between 1 and {}, got: {}",
                        crate::defaults::MAX_TIMEOUT_SECONDS,
                        timeout
                    )));
                }
            }
            "SPEEDTEST_INSECURE" | "SPEEDTEST_ENABLE_COLOR" => {
                value.trim().parse::<bool>().map_err(|e| {
                    AppError::config(format!("Invalid {} value '{}': {}", key, value, e))
                })?;
            }
            "SPEEDTEST_IP_FAMILY" => {
                value.parse::<IpFamily>().map_err(|e| {
                    AppError::config(format!("Invalid SPEEDTEST_IP_FAMILY value '{}': {}", value, e))
                })?;
            }
            "SPEEDTEST_CLIENT_CERT" => {
                if !value.trim().is_empty() && !Path::new(value.trim()).is_file() {
                    return Err(AppError::config(format!(
                        "SPEEDTEST_CLIENT_CERT does not point to a file: {}",
                        value
                    )));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SPEEDTEST_BASE_URL", "Base URL of the speed test server", "https://speed.cloudflare.com"),
            ("SPEEDTEST_LATENCY_COUNT", "Iterations of the latency test (1-100)", "20"),
            ("SPEEDTEST_INSECURE", "Skip server certificate verification", "false"),
            ("SPEEDTEST_CLIENT_CERT", "PEM file with client certificate and key", "/path/to/client.pem"),
            ("SPEEDTEST_TIMEOUT_SECONDS", "Per-request timeout in seconds (1-600)", "120"),
            ("SPEEDTEST_IP_FAMILY", "Address family: ipv4, ipv6 or any", "ipv4"),
            ("SPEEDTEST_ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}
