//! Structured logging for the harness
//!
//! There is no process-wide logger. The executor builds one [`Logger`] from the
//! run configuration and hands each component its own named child:
//! - levels from trace to fatal, filtered per logger
//! - console, JSON and compact line formats
//! - a session id shared by every child so lines from one run correlate
//! - structured `{key=value}` fields attached through a builder

use crate::error::{AppError, Result};
use crate::models::RunConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - severe error events that cause application termination
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
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[35m",
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
            _ => Err(AppError::config(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "console" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(AppError::config(format!("Invalid log format: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Context shared by a logger and all of its children
#[derive(Debug, Default)]
struct LogContext {
    /// Correlation id for the whole run
    session_id: Option<String>,
    /// Fields added to every entry
    context_fields: HashMap<String, serde_json::Value>,
}

/// Where formatted lines end up
#[derive(Clone)]
enum LogSink {
    /// Warn and above to stderr, the rest to stdout
    Console,
    /// Everything to stderr, keeping stdout free for machine-readable output
    Stderr,
    /// In-memory buffer, used by tests
    Memory(Arc<Mutex<Vec<String>>>),
}

/// Handle to the lines recorded by a capturing logger
#[derive(Clone)]
pub struct LogCapture {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    /// Snapshot of everything written so far
    pub async fn lines(&self) -> Vec<String> {
        self.lines.lock().await.clone()
    }

    pub async fn contains(&self, needle: &str) -> bool {
        self.lines.lock().await.iter().any(|line| line.contains(needle))
    }
}

/// Logger handed to each component at construction
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    sink: LogSink,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name: name.into(),
            sink: LogSink::Console,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger from the run configuration
    pub fn with_config(name: impl Into<String>, config: &RunConfig) -> Self {
        let min_level = config.log_level.unwrap_or(if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        });

        Self {
            min_level,
            use_color: config.enable_color,
            format: config.log_format,
            name: name.into(),
            sink: if config.json_output { LogSink::Stderr } else { LogSink::Console },
            context: Arc::new(RwLock::new(LogContext {
                session_id: Some(Uuid::new_v4().to_string()),
                context_fields: HashMap::new(),
            })),
        }
    }

    /// Logger that records formatted lines in memory instead of printing them
    pub fn capturing(name: impl Into<String>, min_level: LogLevel) -> (Self, LogCapture) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let logger = Self {
            min_level,
            use_color: false,
            format: LogFormat::Compact,
            name: name.into(),
            sink: LogSink::Memory(lines.clone()),
            context: Arc::new(RwLock::new(LogContext::default())),
        };
        (logger, LogCapture { lines })
    }

    /// Named logger sharing this logger's settings and session context
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Set output format
    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub async fn session_id(&self) -> Option<String> {
        self.context.read().await.session_id.clone()
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key.to_string(), json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

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

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

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
        for (key, value) in &context.context_fields {
            entry.fields.insert(key.clone(), value.clone());
        }
        drop(context);

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        };

        match &self.sink {
            LogSink::Console if entry.level < LogLevel::Warn => {
                let _ = writeln!(io::stdout(), "{}", output);
            }
            LogSink::Console | LogSink::Stderr => {
                let _ = writeln!(io::stderr(), "{}", output);
            }
            LogSink::Memory(lines) => lines.lock().await.push(output),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        let mut fields: Vec<String> = entry
            .fields
            .iter()
            .filter(|(k, _)| k.as_str() != "session_id")
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        if !fields.is_empty() {
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}",
                entry.message
            ),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
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
                fields: HashMap::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
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
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("Compact").unwrap(), LogFormat::Compact);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[tokio::test]
    async fn test_logger_with_config() {
        let config = RunConfig {
            debug: true,
            enable_color: false,
            ..Default::default()
        };

        let logger = Logger::with_config("TEST", &config);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert!(!logger.use_color);
        assert!(logger.session_id().await.is_some());
    }

    #[tokio::test]
    async fn test_explicit_level_wins() {
        let config = RunConfig {
            debug: true,
            log_level: Some(LogLevel::Error),
            ..Default::default()
        };
        let logger = Logger::with_config("TEST", &config);
        assert!(!logger.would_log(LogLevel::Warn));
        assert!(logger.would_log(LogLevel::Error));
    }

    #[tokio::test]
    async fn test_child_shares_session() {
        let logger = Logger::with_config("executor", &RunConfig::default());
        let child = logger.child("producer-0");
        assert_eq!(child.name(), "producer-0");
        assert_eq!(child.session_id().await, logger.session_id().await);
    }

    #[tokio::test]
    async fn test_capture_filters_by_level() {
        let (logger, capture) = Logger::capturing("TEST", LogLevel::Warn);
        logger.info("hidden").log().await;
        logger.warn("send failed").field("attempt", 3).log().await;

        let lines = capture.lines().await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("W TEST: send failed"));
    }

    #[tokio::test]
    async fn test_context_fields_reach_children() {
        let (logger, _capture) = Logger::capturing("TEST", LogLevel::Info);
        logger.add_context_field("endpoint", "local").await;
        let child = logger.child("consumer-1");
        let context = child.context.read().await;
        assert!(context.context_fields.contains_key("endpoint"));
    }

    #[test]
    fn test_log_formats() {
        let logger = Logger::new("TEST");
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Test message".to_string(),
            logger: "TEST".to_string(),
            fields: HashMap::from([("sent".to_string(), serde_json::json!(5))]),
        };

        let console = logger.format_console(&entry);
        assert!(console.contains("Test message"));
        assert!(console.contains("{sent=5}"));

        let json = logger.format_json(&entry);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["message"], "Test message");

        let compact = logger.format_compact(&entry);
        assert!(compact.contains("I TEST: Test message"));
    }
}
