//! Error handling for the hub latency tester

use thiserror::Error;

/// Custom error types for the hub latency tester
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Configuration-related errors (unknown selectors, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure to open or keep a session with the broadcast endpoint
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single remote invocation failed
    #[error("Send error: {0}")]
    Send(String),

    /// The hub answered with something we could not understand
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// I/O errors (file operations, stdin, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, numbers)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Run orchestration errors
    #[error("Execution error: {0}")]
    Execution(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection(message.into())
    }

    /// Create a new send error
    pub fn send<S: Into<String>>(message: S) -> Self {
        Self::Send(message.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new execution error
    pub fn execution<S: Into<String>>(message: S) -> Self {
        Self::Execution(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Connection(_) => "CONNECTION",
            Self::Send(_) => "SEND",
            Self::Protocol(_) => "PROTOCOL",
            Self::Timeout(_) => "TIMEOUT",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Execution(_) => "EXECUTION",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the failing operation may simply be attempted again
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Send(_) | Self::Timeout(_) | Self::Connection(_) => true,
            Self::Config(_) | Self::Parse(_) | Self::Protocol(_) => false,
            Self::Io(_) | Self::Execution(_) | Self::Internal(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Parse(_) => 1,
            Self::Connection(_) | Self::Send(_) | Self::Protocol(_) => 2,
            Self::Timeout(_) => 3,
            Self::Io(_) => 5,
            Self::Execution(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Connection(_) | Self::Send(_) | Self::Protocol(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) | Self::Execution(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::protocol(format!("JSON error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() {
            Self::connection(error.to_string())
        } else if error.is_decode() {
            Self::protocol(error.to_string())
        } else {
            Self::send(error.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match error {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                Self::connection("socket closed")
            }
            WsError::Io(e) => Self::connection(e.to_string()),
            other => Self::protocol(other.to_string()),
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        if error.is_panic() {
            Self::internal(format!("worker panicked: {}", error))
        } else {
            Self::execution(format!("worker aborted: {}", error))
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Invalid configuration");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(!config_error.is_recoverable());
        assert_eq!(config_error.exit_code(), 1);

        let connection_error = AppError::connection("refused");
        assert_eq!(connection_error.category(), "CONNECTION");
        assert!(connection_error.is_recoverable());
        assert_eq!(connection_error.exit_code(), 2);
    }

    #[test]
    fn test_error_display() {
        let error = AppError::config("Unknown transport 'pigeon'");
        let display = error.to_string();
        assert!(display.contains("Configuration error"));
        assert!(display.contains("pigeon"));
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::connection("connection"),
            AppError::send("send"),
            AppError::protocol("protocol"),
            AppError::timeout("timeout"),
            AppError::io("io"),
            AppError::parse("parse"),
            AppError::execution("execution"),
            AppError::internal("internal"),
        ];

        let expected_categories = [
            "CONFIG", "CONNECTION", "SEND", "PROTOCOL", "TIMEOUT",
            "IO", "PARSE", "EXECUTION", "INTERNAL",
        ];

        for (error, expected) in errors.iter().zip(expected_categories.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::send("test").exit_code(), 2);
        assert_eq!(AppError::timeout("test").exit_code(), 3);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::execution("test").exit_code(), 6);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "not_a_number".parse::<i32>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");

        let url_error = url::Url::parse("not a url").unwrap_err();
        let app_error: AppError = url_error.into();
        assert!(app_error.to_string().contains("URL parse error"));
    }

    #[test]
    fn test_json_error_is_protocol() {
        let json_error = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let app_error: AppError = json_error.into();
        assert_eq!(app_error.category(), "PROTOCOL");
    }

    #[test]
    fn test_dotenv_error_conversion() {
        let dotenv_error = dotenv::Error::LineParse(".env".to_string(), 1);
        let app_error: AppError = dotenv_error.into();
        assert_eq!(app_error.category(), "CONFIG");
        assert!(app_error.to_string().contains("Environment file error"));
    }

    #[test]
    fn test_socket_closed_is_connection_error() {
        let err: AppError = tokio_tungstenite::tungstenite::Error::ConnectionClosed.into();
        assert_eq!(err.category(), "CONNECTION");
    }

    #[tokio::test]
    async fn test_join_error_from_panicking_task() {
        let handle = tokio::spawn(async { panic!("boom") });
        let join_error = handle.await.unwrap_err();
        let app_error: AppError = join_error.into();
        assert_eq!(app_error.category(), "INTERNAL");
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::send("hub returned 500");
        let plain = error.format_for_console(false);
        let colored = error.format_for_console(true);

        assert!(plain.starts_with("[SEND]"));
        assert!(colored.contains("SEND"));
        assert!(colored.contains("hub returned 500"));
    }

    #[test]
    fn test_anyhow_integration() {
        let anyhow_error = anyhow::anyhow!("Test anyhow error");
        let app_error: AppError = anyhow_error.into();
        assert_eq!(app_error.category(), "INTERNAL");

        let app_error = AppError::config("Test config error");
        let anyhow_error = anyhow::anyhow!(app_error);
        assert!(anyhow_error.to_string().contains("Configuration error"));
    }
}
