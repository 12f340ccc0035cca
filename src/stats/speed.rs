//! Throughput calculation from transferred bytes and transfer-phase time

use super::{durations_to_secs, StatisticsEngine, StatsError, StatsResult};
use std::time::Duration;

/// Converts bytes moved over a transfer phase into megabits per second
pub struct SpeedCalculator;

impl SpeedCalculator {
    /// `bytes * 8 / seconds / 1e6`
    pub fn throughput_mbps(bytes: u64, transfer: Duration) -> StatsResult<f64> {
        Self::throughput_over_secs(bytes, transfer.as_secs_f64())
    }

    /// Throughput of a trial: the payload size over the mean transfer time of
    /// its successful iterations.
    pub fn mean_throughput_mbps(bytes: u64, transfers: &[Duration]) -> StatsResult<f64> {
        let mean_secs = StatisticsEngine::mean(&durations_to_secs(transfers))?;
        Self::throughput_over_secs(bytes, mean_secs)
    }

    fn throughput_over_secs(bytes: u64, secs: f64) -> StatsResult<f64> {
        if secs <= 0.0 {
            return Err(StatsError::NonPositiveDuration);
        }
        Ok((bytes as f64 * 8.0) / secs / 1e6)
    }
}
