//! Network Speed Tester
//!
//! Measures latency, jitter and throughput against a speed-test endpoint by
//! issuing repeated, instrumented downloads and uploads of varying payload
//! sizes and breaking every exchange down into its DNS, TCP connect, TLS,
//! server processing and transfer phases.

pub mod app;
pub mod cli;
pub mod config;
pub mod client;
pub mod dns;
pub mod error;
pub mod logging;
pub mod stats;
pub mod executor;
pub mod output;
pub mod models;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, ExchangeOutcome, SummaryMetrics, TestSpec, TrialResult};
pub use stats::{SpeedCalculator, StatisticsEngine};
pub use client::{Exchange, TimedExchange};
pub use executor::{Orchestrator, TrialRunner};
pub use output::{OutputFormatter, ColoredFormatter, PlainFormatter, JsonFormatter, OutputCoordinator, VerboseTrialFormatter};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Build information recorded by the build script
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_BASE_URL: &str = "https://speed.cloudflare.com";
    pub const DOWNLOAD_PATH: &str = "/__down";
    pub const UPLOAD_PATH: &str = "/__up";

    pub const DEFAULT_LATENCY_ITERATIONS: u32 = 20;

    /// `(payload bytes, iterations, label)`, ascending size
    pub const DEFAULT_DOWNLOAD_TESTS: &[(u64, u32, &str)] = &[
        (101_000, 10, "100kB"),
        (1_001_000, 8, "1MB"),
        (10_001_000, 6, "10MB"),
    ];
    pub const DEFAULT_UPLOAD_TESTS: &[(u64, u32, &str)] = &[
        (101_000, 8, "100kB"),
        (1_001_000, 6, "1MB"),
        (10_001_000, 4, "10MB"),
    ];

    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
    pub const MAX_TIMEOUT_SECONDS: u64 = 600;
    pub const MAX_LATENCY_ITERATIONS: u32 = 100;
    pub const DIAL_TIMEOUT: Duration = Duration::from_secs(30);
    pub const TCP_KEEP_ALIVE: Duration = Duration::from_secs(30);
    pub const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
    pub const EXPECT_CONTINUE_TIMEOUT: Duration = Duration::from_secs(1);
    pub const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(90);

    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36";

    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
