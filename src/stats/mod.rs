//! Statistical calculations over per-iteration phase durations
//!
//! All functions operate on plain `f64` sample slices (milliseconds or
//! megabits per second, depending on the caller) and never fabricate a value
//! for an empty input: they fail with [`StatsError::EmptyInput`] instead.

pub mod speed;

pub use speed::SpeedCalculator;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures of a statistical computation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsError {
    /// No samples were supplied
    #[error("Input must not be empty.")]
    EmptyInput,

    /// A percentile argument outside of [0, 100]
    #[error("Input is outside of range.")]
    Bounds,

    /// A sample was not a number
    #[error("Not a number.")]
    NaN,

    /// A throughput was requested over a zero-length transfer
    #[error("Transfer duration must be greater than zero.")]
    NonPositiveDuration,
}

/// Result type for statistical computations
pub type StatsResult<T> = std::result::Result<T, StatsError>;

/// Stateless statistics over duration samples
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Arithmetic mean.
    pub fn mean(samples: &[f64]) -> StatsResult<f64> {
        check_samples(samples)?;
        Ok(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// Jitter: sample standard deviation with Bessel's correction.
    ///
    /// A single sample has no dispersion and yields `0.0`.
    pub fn jitter(samples: &[f64]) -> StatsResult<f64> {
        let mean = Self::mean(samples)?;
        if samples.len() == 1 {
            return Ok(0.0);
        }

        let sum_squared_diff: f64 = samples.iter().map(|&x| (x - mean).powi(2)).sum();
        Ok((sum_squared_diff / (samples.len() - 1) as f64).sqrt())
    }

    /// The p-th percentile (0-100) by linear interpolation between the two
    /// bracketing order statistics, with rank `p / 100 * (n - 1)`.
    pub fn percentile(samples: &[f64], p: f64) -> StatsResult<f64> {
        check_samples(samples)?;
        if !p.is_finite() || !(0.0..=100.0).contains(&p) {
            return Err(StatsError::Bounds);
        }

        let sorted = sorted_copy(samples);
        let rank = (p / 100.0) * (sorted.len() as f64 - 1.0);
        let lower_index = rank.floor() as usize;
        let upper_index = rank.ceil() as usize;

        if lower_index == upper_index {
            Ok(sorted[lower_index])
        } else {
            let lower_value = sorted[lower_index];
            let upper_value = sorted[upper_index];
            let weight = rank - lower_index as f64;
            Ok(lower_value + weight * (upper_value - lower_value))
        }
    }

    /// Summary of a sample set for detailed reporting
    pub fn summarize(samples: &[f64]) -> StatsResult<SampleSummary> {
        let sorted = sorted_copy(samples);
        Ok(SampleSummary {
            count: samples.len(),
            mean: Self::mean(samples)?,
            jitter: Self::jitter(samples)?,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p50: Self::percentile(&sorted, 50.0)?,
            p90: Self::percentile(&sorted, 90.0)?,
        })
    }
}

/// Descriptive statistics of one sample set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub count: usize,
    pub mean: f64,
    pub jitter: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p90: f64,
}

/// Convert durations to fractional milliseconds
pub fn durations_to_ms(durations: &[Duration]) -> Vec<f64> {
    durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect()
}

/// Convert durations to fractional seconds
pub fn durations_to_secs(durations: &[Duration]) -> Vec<f64> {
    durations.iter().map(Duration::as_secs_f64).collect()
}

fn check_samples(samples: &[f64]) -> StatsResult<()> {
    if samples.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    if samples.iter().any(|x| x.is_nan()) {
        return Err(StatsError::NaN);
    }
    Ok(())
}

fn sorted_copy(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
