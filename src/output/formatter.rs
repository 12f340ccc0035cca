//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface, the plain `key value`
//! and JSON renderings of a run summary, and the table helper shared with the
//! verbose formatter.

use crate::{
    error::{AppError, Result},
    models::{MetricPair, MetricUnit, SummaryMetrics},
};
use serde_json::{Map, Number, Value};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Render the run summary as the primary program output
    fn format_metrics(&self, summary: &SummaryMetrics) -> Result<String>;
}

/// Text of a metric value, or `None` when the metric is absent.
///
/// Timestamps print as integers, everything else with two decimals.
pub fn format_value(pair: &MetricPair) -> Option<String> {
    let value = pair.value?;
    Some(match pair.unit {
        MetricUnit::Timestamp => format!("{}", value as i64),
        MetricUnit::Milliseconds | MetricUnit::Mbps => format!("{:.2}", value),
    })
}

/// `key value` lines, absent metrics omitted
pub struct PlainFormatter;

impl PlainFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_metrics(&self, summary: &SummaryMetrics) -> Result<String> {
        let mut output = String::new();
        for pair in summary.to_pairs() {
            if let Some(value) = format_value(&pair) {
                writeln!(output, "{} {}", pair.key, value)
                    .map_err(|e| AppError::io(format!("Failed to format metrics: {}", e)))?;
            }
        }
        Ok(output)
    }
}

/// One JSON object keyed by metric name, absent metrics as `null`
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn to_value(pair: &MetricPair) -> Value {
        match (pair.value, pair.unit) {
            (None, _) => Value::Null,
            (Some(v), MetricUnit::Timestamp) => Value::from(v as i64),
            (Some(v), _) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_metrics(&self, summary: &SummaryMetrics) -> Result<String> {
        let object: Map<String, Value> = summary
            .to_pairs()
            .iter()
            .map(|pair| (pair.key.clone(), Self::to_value(pair)))
            .collect();
        let value = Value::Object(object);

        let mut rendered = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        rendered.push('\n');
        Ok(rendered)
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width: 0,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone, Copy)]
pub enum Alignment {
    Left,
    Right,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Render rows under the given columns
pub fn render_table(format: &TableFormat, rows: &[RowData]) -> String {
    let widths: Vec<usize> = format
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .chain([column.header.chars().count(), column.min_width])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut output = String::new();
    let headers: RowData = format.columns.iter().map(|c| c.header.clone()).collect();

    if format.show_borders {
        output.push_str(&horizontal_border(&widths));
        output.push('\n');
    }
    output.push_str(&render_row(&headers, &widths, format));
    output.push('\n');
    if format.show_borders {
        output.push_str(&horizontal_border(&widths));
        output.push('\n');
    }

    for row in rows {
        output.push_str(&render_row(row, &widths, format));
        output.push('\n');
    }

    if format.show_borders {
        output.push_str(&horizontal_border(&widths));
        output.push('\n');
    }
    output
}

fn render_row(cells: &[String], widths: &[usize], format: &TableFormat) -> String {
    let mut row = String::new();
    if format.show_borders {
        row.push('|');
    }

    for (idx, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        let alignment = format.columns.get(idx).map_or(Alignment::Left, |c| c.alignment);
        let padded = align_text(cell, width, alignment);
        if format.show_borders {
            row.push(' ');
            row.push_str(&padded);
            row.push_str(" |");
        } else {
            row.push_str(&padded);
            row.push_str("  ");
        }
    }

    row.trim_end().to_string()
}

fn horizontal_border(widths: &[usize]) -> String {
    let mut border = String::from("+");
    for &width in widths {
        border.push_str(&"-".repeat(width + 2));
        border.push('+');
    }
    border
}

fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let padding = " ".repeat(width - len);
    match alignment {
        Alignment::Left => format!("{}{}", text, padding),
        Alignment::Right => format!("{}{}", padding, text),
    }
}
