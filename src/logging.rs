//! Structured logging for the speed tester
//!
//! This module provides:
//! - Leveled, structured log entries built with a fluent builder
//! - Console and JSON renderings
//! - A per-run session id attached to every entry
//! - Correlated operations (one per trial)
//! - An in-memory sink so tests can assert on what was logged
//!
//! All entries go to stderr; stdout is reserved for the metrics.

use crate::error::{AppError, Result};
use crate::models::{Config, PhaseDurations, TrialResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - per-exchange phase breakdowns
    Debug = 1,
    /// Info level - per-trial summaries
    Info = 2,
    /// Warning level - degraded results, e.g. a trial without samples
    Warn = 3,
    /// Error level - failed exchanges; the run continues
    Error = 4,
    /// Fatal level - the run is aborted
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
            LogLevel::Fatal => "\x1b[35m",    // Magenta
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
    /// File and line information
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

/// Where rendered entries end up
#[derive(Debug, Clone)]
enum LogSink {
    Stderr,
    Memory(Arc<Mutex<Vec<LogEntry>>>),
}

/// Entries collected by a capturing logger
#[derive(Debug, Clone)]
pub struct LogCapture {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogCapture {
    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of entries logged at exactly `level`
    pub fn count(&self, level: LogLevel) -> usize {
        self.entries().iter().filter(|e| e.level == level).count()
    }
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    current_correlation_id: Option<String>,
}

/// Logger implementation with multiple output formats
///
/// Clones and [`Logger::named`] children share the session context and sink.
#[derive(Debug, Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
    sink: LogSink,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
            sink: LogSink::Stderr,
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.log_json { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
            sink: LogSink::Stderr,
        }
    }

    /// A logger that records every entry in memory instead of writing it
    pub fn capture(name: &str) -> (Self, LogCapture) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let mut logger = Self::new(name.to_string());
        logger.min_level = LogLevel::Trace;
        logger.use_color = false;
        logger.sink = LogSink::Memory(entries.clone());
        (logger, LogCapture { entries })
    }

    /// Child logger for a component, sharing context and sink
    pub fn named(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.min_level
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Enable or disable colored output
    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Start a correlated operation
    pub async fn start_operation(&self, operation_name: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        {
            let mut context = self.context.write().await;
            context.current_correlation_id = Some(correlation_id.clone());
        }

        self.debug(&format!("Started operation: {}", operation_name))
            .correlation_id(&correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "start")
            .log()
            .await;

        correlation_id
    }

    /// End a correlated operation
    pub async fn end_operation(&self, correlation_id: &str, operation_name: &str, success: bool) {
        self.debug(&format!("Completed operation: {} (success: {})", operation_name, success))
            .correlation_id(correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "end")
            .field("success", success)
            .log()
            .await;

        let mut context = self.context.write().await;
        if context.current_correlation_id.as_deref() == Some(correlation_id) {
            context.current_correlation_id = None;
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    /// Convenience methods for different log levels
    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn fatal(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Fatal, message)
    }

    /// Write log entry to output
    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry
                .fields
                .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        if entry.correlation_id.is_none() {
            entry.correlation_id = context.current_correlation_id.clone();
        }
        drop(context);

        match &self.sink {
            LogSink::Stderr => {
                let output = match self.format {
                    LogFormat::Console => self.format_console(&entry),
                    LogFormat::Json => self.format_json(&entry),
                };
                let _ = writeln!(io::stderr(), "{}", output);
            }
            LogSink::Memory(entries) => {
                if let Ok(mut entries) = entries.lock() {
                    entries.push(entry);
                }
            }
        }
    }

    /// Format log entry for console output
    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields_str: Vec<String> = entry
                .fields
                .iter()
                .filter(|(k, _)| k.as_str() != "session_id")
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields_str.sort();
            if !fields_str.is_empty() {
                output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
            }
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    /// Format log entry as JSON
    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}",
                entry.message
            ),
        }
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
                location: None,
            },
        }
    }

    /// Add a correlation ID
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add location information
    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Add the phase breakdown of one exchange
    pub fn phases(self, durations: &PhaseDurations) -> Self {
        self.field("dns_ms", durations.dns_ms())
            .field("tcp_ms", durations.tcp_ms())
            .field("tls_ms", durations.tls_ms())
            .field("server_ms", durations.server_ms())
            .field("transfer_ms", durations.transfer_ms())
            .field("total_ms", durations.total_ms())
    }

    /// Add the sample counts of a finished trial
    pub fn trial(self, trial: &TrialResult) -> Self {
        self.field("label", &trial.label)
            .field("direction", trial.direction)
            .field("payload_bytes", trial.payload_bytes)
            .field("attempted", trial.attempted)
            .field("succeeded", trial.success_count())
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Creates loggers sharing one session id
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    /// Create a new logger factory
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    /// Get session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn test_logger_with_config() {
        let config = Config {
            debug: true,
            enable_color: false,
            log_json: true,
            ..Default::default()
        };
        let logger = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(logger.level(), LogLevel::Debug);
        assert_eq!(logger.format, LogFormat::Json);
        assert!(!logger.use_color);

        let quiet = Logger::with_config("TEST".to_string(), &Config::default());
        assert_eq!(quiet.level(), LogLevel::Warn);

        let verbose = Logger::with_config(
            "TEST".to_string(),
            &Config {
                verbose: true,
                ..Default::default()
            },
        );
        assert_eq!(verbose.level(), LogLevel::Info);
    }

    #[tokio::test]
    async fn test_fatal_passes_quiet_level() {
        let (mut logger, capture) = Logger::capture("TEST");
        logger.set_level(LogLevel::Error);

        logger.warn("hidden").log().await;
        logger.fatal("aborted").log().await;

        let entries = capture.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Fatal);
    }

    #[tokio::test]
    async fn test_capture_records_entries_with_session() {
        let (logger, capture) = Logger::capture("TEST");
        logger.set_session_id("session-1".to_string()).await;

        logger.error("exchange failed").field("url", "https://x").log().await;
        logger.named("CHILD").info("trial done").log().await;

        let entries = capture.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(entries[0].fields["session_id"], "session-1");
        assert_eq!(entries[1].logger, "CHILD");
        assert_eq!(capture.count(LogLevel::Error), 1);
    }

    #[tokio::test]
    async fn test_level_filtering_applies_to_capture() {
        let (mut logger, capture) = Logger::capture("TEST");
        logger.set_level(LogLevel::Warn);

        logger.debug("hidden").log().await;
        logger.warn("shown").log().await;

        assert_eq!(capture.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_operation_correlation() {
        let (logger, capture) = Logger::capture("TEST");
        let correlation_id = logger.start_operation("latency").await;
        logger.info("inside").log().await;
        logger.end_operation(&correlation_id, "latency", true).await;
        logger.info("after").log().await;

        let entries = capture.entries();
        assert_eq!(entries[1].correlation_id.as_deref(), Some(correlation_id.as_str()));
        assert!(entries[3].correlation_id.is_none());
    }

    #[tokio::test]
    async fn test_error_info_fields() {
        let (logger, capture) = Logger::capture("TEST");
        logger
            .error("boom")
            .error_info(&AppError::timeout("slow"))
            .log()
            .await;

        let entry = &capture.entries()[0];
        assert_eq!(entry.fields["error_category"], "TIMEOUT");
        assert_eq!(entry.fields["error_recoverable"], true);
    }

    #[test]
    fn test_log_formats() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Test message".to_string(),
            logger: "TEST".to_string(),
            correlation_id: Some("0123456789".to_string()),
            fields: {
                let mut map = HashMap::new();
                map.insert("key".to_string(), serde_json::Value::String("value".to_string()));
                map
            },
            location: None,
        };

        let mut logger = Logger::new("TEST".to_string());
        logger.set_color(false);

        let console_output = logger.format_console(&entry);
        assert!(console_output.contains("INFO"));
        assert!(console_output.contains("Test message"));
        assert!(console_output.contains("[01234567]"));
        assert!(console_output.contains("key=\"value\""));

        let json_output = logger.format_json(&entry);
        assert!(json_output.starts_with('{'));
        assert!(json_output.ends_with('}'));
    }

    #[test]
    fn test_log_entry_serialization() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Warn,
            message: "Test".to_string(),
            logger: "TEST".to_string(),
            correlation_id: None,
            fields: HashMap::new(),
            location: None,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: LogEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.level, LogLevel::Warn);
        assert_eq!(deserialized.message, "Test");
    }

    #[tokio::test]
    async fn test_logger_factory() {
        let factory = LoggerFactory::new(Config::default());
        let logger = factory.create_logger("APP").await;
        assert_eq!(logger.name(), "APP");
        assert!(!factory.session_id().is_empty());
    }
}
