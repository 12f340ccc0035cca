//! Type definitions and aliases

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Direction of a payload transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// GET against the download endpoint; the payload is the response body
    Download,
    /// POST against the upload endpoint; the payload is the request body
    Upload,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Download => "download",
            Direction::Upload => "upload",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address family used when dialing the speed test host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    /// IPv4 only
    #[default]
    V4,
    /// IPv6 only
    V6,
    /// Whatever the resolver returns first
    Any,
}

impl IpFamily {
    /// Whether an address may be dialed under this family
    pub fn allows(&self, addr: &std::net::IpAddr) -> bool {
        match self {
            IpFamily::V4 => addr.is_ipv4(),
            IpFamily::V6 => addr.is_ipv6(),
            IpFamily::Any => true,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IpFamily::V4 => "ipv4",
            IpFamily::V6 => "ipv6",
            IpFamily::Any => "any",
        })
    }
}

impl FromStr for IpFamily {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "v4" | "4" | "ipv4" => Ok(IpFamily::V4),
            "v6" | "6" | "ipv6" => Ok(IpFamily::V6),
            "any" | "both" => Ok(IpFamily::Any),
            other => Err(AppError::parse(format!("Invalid IP family: {}", other))),
        }
    }
}

/// Format of the emitted metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `key value` line per metric
    #[default]
    Text,
    /// A single JSON document
    Json,
}

/// Outcome status of a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    /// Status 200 and fully drained body
    Success,
    /// Transport failure or non-success status
    Failed,
    /// One of the transport timeouts fired
    Timeout,
}
