//! Command-line interface

use crate::types::{IpFamily, OutputFormat};
use clap::{ArgAction, ArgGroup, Parser};
use std::path::PathBuf;

/// Network Speed Tester - measures latency, jitter and throughput against a
/// speed test endpoint
#[derive(Parser, Debug, Clone)]
#[command(name = "nst")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("ip_family").args(["ipv4", "ipv6", "any_ip"])))]
pub struct Cli {
    /// Base URL of the speed test server
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Number of iterations of the latency test (1-100)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub latency_count: Option<u32>,

    /// Skip verification of the server certificate
    #[arg(long)]
    pub insecure: bool,

    /// PEM file holding a client certificate and its private key
    #[arg(long, value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// Extra request header, "Name: value" (can be used multiple times)
    #[arg(short = 'H', long = "header", value_name = "HEADER", action = ArgAction::Append)]
    pub headers: Vec<String>,

    /// Connect over IPv4 only (default)
    #[arg(long)]
    pub ipv4: bool,

    /// Connect over IPv6 only
    #[arg(long)]
    pub ipv6: bool,

    /// Connect over IPv4 or IPv6
    #[arg(long)]
    pub any_ip: bool,

    /// Per-request timeout in seconds
    #[arg(short, long, value_name = "SECONDS", value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Only run the listed test sizes (comma-separated labels, e.g. 100kB,1MB)
    #[arg(long, value_name = "LABELS", value_delimiter = ',')]
    pub sizes: Option<Vec<String>>,

    /// Output format
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write metrics to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output (per-trial phase breakdown)
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output (per-exchange logging)
    #[arg(long)]
    pub debug: bool,

    /// Emit log entries as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Write an example .env file and exit
    #[arg(long, value_name = "FILE")]
    pub write_env_example: Option<PathBuf>,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(sizes) = &self.sizes {
            if sizes.iter().all(|s| s.trim().is_empty()) {
                return Err("--sizes requires at least one label".to_string());
            }
        }

        Ok(())
    }

    /// Address family selected on the command line, if any
    pub fn ip_family(&self) -> Option<IpFamily> {
        if self.ipv4 {
            Some(IpFamily::V4)
        } else if self.ipv6 {
            Some(IpFamily::V6)
        } else if self.any_ip {
            Some(IpFamily::Any)
        } else {
            None
        }
    }

    /// Size labels with surrounding whitespace removed
    pub fn size_labels(&self) -> Option<Vec<String>> {
        self.sizes.as_ref().map(|sizes| {
            sizes
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    /// Color choice forced on the command line, if any
    pub fn color_override(&self) -> Option<bool> {
        if self.color {
            Some(true)
        } else if self.no_color {
            Some(false)
        } else {
            None
        }
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        self.color_override().unwrap_or_else(supports_color)
    }
}

/// Parse a timeout in whole seconds
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > crate::defaults::MAX_TIMEOUT_SECONDS {
                Err(format!(
                    "Duration cannot exceed {} seconds",
                    crate::defaults::MAX_TIMEOUT_SECONDS
                ))
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
