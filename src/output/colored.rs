//! Colored formatter implementation with terminal color support
//!
//! Same `key value` lines as the plain formatter; keys are highlighted and
//! values are colored by how good the measurement is.

use super::formatter::{format_value, OutputFormatter};
use crate::{
    error::{AppError, Result},
    models::{MetricUnit, SummaryMetrics},
};
use colored::*;
use std::fmt::Write as _;

/// Performance level classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceLevel {
    /// Classify a latency or jitter in milliseconds
    pub fn from_latency(ms: f64) -> Self {
        if ms < 20.0 {
            Self::Excellent
        } else if ms < 50.0 {
            Self::Good
        } else if ms < 150.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Classify a throughput in megabits per second
    pub fn from_throughput(mbps: f64) -> Self {
        if mbps >= 100.0 {
            Self::Excellent
        } else if mbps >= 25.0 {
            Self::Good
        } else if mbps >= 5.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub key: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            key: Color::Blue,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new() -> Self {
        Self::with_color_scheme(ColorScheme::default())
    }

    pub fn with_color_scheme(color_scheme: ColorScheme) -> Self {
        Self { color_scheme }
    }

    fn colorize_value(&self, text: &str, value: f64, unit: MetricUnit) -> ColoredString {
        match unit {
            MetricUnit::Timestamp => text.color(self.color_scheme.muted),
            MetricUnit::Milliseconds => text.color(PerformanceLevel::from_latency(value).color()),
            MetricUnit::Mbps => text.color(PerformanceLevel::from_throughput(value).color()).bold(),
        }
    }
}

impl Default for ColoredFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_metrics(&self, summary: &SummaryMetrics) -> Result<String> {
        let mut output = String::new();
        for pair in summary.to_pairs() {
            let (Some(text), Some(value)) = (format_value(&pair), pair.value) else {
                continue;
            };
            writeln!(
                output,
                "{} {}",
                pair.key.color(self.color_scheme.key),
                self.colorize_value(&text, value, pair.unit)
            )
            .map_err(|e| AppError::io(format!("Failed to format metrics: {}", e)))?;
        }
        Ok(output)
    }
}
