//! Output formatting and display system
//!
//! The run summary is the program's primary output: `key value` lines
//! (optionally colored) or a JSON object, written to stdout or a file.
//! Verbose per-trial tables are diagnostics and go to stderr.

mod colored;
mod formatter;
mod verbose;

pub use colored::{ColorScheme, ColoredFormatter, PerformanceLevel};
pub use formatter::{
    format_value, render_table, Alignment, Column, JsonFormatter, OutputFormatter, PlainFormatter,
    RowData, TableFormat,
};
pub use verbose::VerboseTrialFormatter;

use crate::{
    error::{AppError, Result},
    executor::RunReport,
    models::Config,
    types::OutputFormat,
};
use std::io::Write;
use std::path::PathBuf;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Formatter for the configured format; colors only on a terminal
    /// destination
    pub fn create_formatter(config: &Config) -> Box<dyn OutputFormatter> {
        match config.output_format {
            OutputFormat::Json => Box::new(JsonFormatter::new(config.output_file.is_some())),
            OutputFormat::Text if config.enable_color && config.output_file.is_none() => {
                Box::new(ColoredFormatter::new())
            }
            OutputFormat::Text => Box::new(PlainFormatter::new()),
        }
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
    verbose_formatter: Option<VerboseTrialFormatter>,
    destination: Option<PathBuf>,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self {
            formatter,
            verbose_formatter: None,
            destination: None,
        }
    }

    /// Coordinator set up from configuration: format, color, destination
    /// and verbose tables
    pub fn from_config(config: &Config) -> Self {
        Self {
            formatter: OutputFormatterFactory::create_formatter(config),
            verbose_formatter: config
                .verbose
                .then(|| VerboseTrialFormatter::new(config.enable_color)),
            destination: config.output_file.clone(),
        }
    }

    pub fn formatter(&self) -> &dyn OutputFormatter {
        self.formatter.as_ref()
    }

    /// Rendered metrics
    pub fn render_metrics(&self, report: &RunReport) -> Result<String> {
        self.formatter.format_metrics(&report.summary)
    }

    /// Rendered per-trial tables, when verbose output is on
    pub fn render_verbose(&self, report: &RunReport) -> Result<Option<String>> {
        self.verbose_formatter
            .as_ref()
            .map(|verbose| verbose.format_trials(&report.trials))
            .transpose()
    }

    /// Write verbose tables to stderr and metrics to their destination
    pub fn emit(&self, report: &RunReport) -> Result<()> {
        if let Some(tables) = self.render_verbose(report)? {
            eprintln!("{}", tables);
        }

        let metrics = self.render_metrics(report)?;
        match &self.destination {
            Some(path) => std::fs::write(path, metrics).map_err(|e| {
                AppError::io(format!("Failed to write metrics to {}: {}", path.display(), e))
            }),
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(metrics.as_bytes())?;
                stdout.flush()?;
                Ok(())
            }
        }
    }
}
