//! Data models and structures for the network speed tester

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::Config;
pub use metrics::{
    ExchangeOutcome, MetricPair, MetricUnit, PhaseDurations, PhaseTimestamps, SizeMetrics,
    SummaryMetrics, TestSpec, TrialResult,
};
