//! Verbose mode output: per-trial phase breakdown tables

use super::formatter::{render_table, Alignment, Column, RowData, TableFormat};
use crate::{
    error::{AppError, Result},
    models::TrialResult,
    stats::{durations_to_ms, StatisticsEngine},
};
use colored::Colorize;
use std::fmt::Write as _;
use std::time::Duration;

/// Renders the samples behind each metric
pub struct VerboseTrialFormatter {
    use_color: bool,
}

impl VerboseTrialFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    /// One section per trial, in the order given
    pub fn format_trials(&self, trials: &[TrialResult]) -> Result<String> {
        let mut output = String::new();

        let title = if self.use_color {
            "PHASE TIMING BREAKDOWN".bright_cyan().bold()
        } else {
            "PHASE TIMING BREAKDOWN".normal()
        };
        writeln!(output, "{}", title)
            .map_err(|e| AppError::io(format!("Failed to format header: {}", e)))?;
        writeln!(output, "{}", "=".repeat(50))
            .map_err(|e| AppError::io(format!("Failed to format header: {}", e)))?;

        for trial in trials {
            output.push('\n');
            output.push_str(&self.format_trial(trial)?);
        }

        Ok(output)
    }

    /// Heading line plus a table of phase statistics in milliseconds
    pub fn format_trial(&self, trial: &TrialResult) -> Result<String> {
        let mut output = String::new();

        let heading = format!(
            "{} {} ({} bytes): {}/{} successful ({:.1}%)",
            trial.direction,
            trial.label,
            trial.payload_bytes,
            trial.success_count(),
            trial.attempted,
            trial.success_rate()
        );
        let heading = heading.as_str();
        let heading = if !self.use_color {
            heading.normal()
        } else if trial.is_empty() {
            heading.red().bold()
        } else if trial.success_count() < trial.attempted as usize {
            heading.yellow().bold()
        } else {
            heading.green().bold()
        };
        writeln!(output, "{}", heading)
            .map_err(|e| AppError::io(format!("Failed to format trial: {}", e)))?;

        if trial.is_empty() {
            writeln!(output, "  no successful iterations")
                .map_err(|e| AppError::io(format!("Failed to format trial: {}", e)))?;
            return Ok(output);
        }

        let format = TableFormat {
            columns: vec![
                Column::new("Phase (ms)", Alignment::Left),
                Column::new("Mean", Alignment::Right),
                Column::new("Min", Alignment::Right),
                Column::new("Max", Alignment::Right),
                Column::new("Jitter", Alignment::Right),
            ],
            show_borders: true,
        };

        let phases: [(&str, &[Duration]); 5] = [
            ("dns lookup", &trial.dns_lookup),
            ("tcp connect", &trial.tcp_connect),
            ("server", &trial.server_processing),
            ("transfer", &trial.transfer),
            ("total", &trial.total),
        ];

        let mut rows: Vec<RowData> = Vec::with_capacity(phases.len());
        for (name, samples) in phases {
            let summary = StatisticsEngine::summarize(&durations_to_ms(samples))?;
            rows.push(vec![
                name.to_string(),
                format!("{:.2}", summary.mean),
                format!("{:.2}", summary.min),
                format!("{:.2}", summary.max),
                format!("{:.2}", summary.jitter),
            ]);
        }

        output.push_str(&render_table(&format, &rows));
        Ok(output)
    }
}
