//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::{DisplayUnit, TransportPreference};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    ///
    /// Variables already set in the process environment are not overwritten.
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Check a single variable without touching the environment
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let positive = |what: &str| -> Result<()> {
            match value.parse::<u64>() {
                Ok(0) => Err(AppError::config(format!("{} must be greater than 0", what))),
                Ok(_) => Ok(()),
                Err(_) => Err(AppError::config(format!("Invalid {} value: {}", key, value))),
            }
        };

        match key {
            "HUB_PRODUCERS" | "HUB_CONSUMERS" | "HUB_PAYLOAD_SIZE" => value
                .parse::<usize>()
                .map(|_| ())
                .map_err(|_| AppError::config(format!("Invalid {} value: {}", key, value))),
            "HUB_FREQUENCY" => positive("Frequency"),
            "HUB_TARGET_COUNT" => positive("Target count"),
            "HUB_DURATION_SECS" => positive("Duration"),
            "HUB_ENDPOINT" => {
                if value == crate::models::config::LOCAL_ENDPOINT {
                    Ok(())
                } else {
                    url::Url::parse(value)
                        .map(|_| ())
                        .map_err(|e| AppError::config(format!("Invalid endpoint '{}': {}", value, e)))
                }
            }
            "HUB_DISPLAY_UNIT" => value.parse::<DisplayUnit>().map(|_| ()),
            "HUB_TRANSPORT" => value.parse::<TransportPreference>().map(|_| ()),
            "ENABLE_COLOR" => value
                .parse::<bool>()
                .map(|_| ())
                .map_err(|_| AppError::config(format!("ENABLE_COLOR must be true or false, got '{}'", value))),
            "LOG_LEVEL" => value.parse::<crate::logging::LogLevel>().map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Supported variables as `(name, description, example)`
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("HUB_PRODUCERS", "Number of producer workers", "5"),
            ("HUB_CONSUMERS", "Number of consumer workers", "5"),
            ("HUB_FREQUENCY", "Messages per second per producer", "100"),
            ("HUB_PAYLOAD_SIZE", "Message body size in bytes", "100"),
            ("HUB_ENDPOINT", "Hub endpoint URL or 'local'", "http://localhost:8123/hub"),
            ("HUB_DISPLAY_UNIT", "Latency display unit", "milliseconds"),
            ("HUB_TRANSPORT", "Transport selector", "auto"),
            ("HUB_TARGET_COUNT", "Successful sends per producer before stopping", "1000"),
            ("HUB_DURATION_SECS", "Run length in seconds", "60"),
            ("ENABLE_COLOR", "Colored terminal output", "true"),
            ("LOG_LEVEL", "Log level", "info"),
        ]
    }

    /// Validate every supported variable currently set; returns the names found
    pub fn validate_current_env() -> Result<Vec<String>> {
        let mut found = Vec::new();
        for (key, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(key) {
                Self::validate_env_var(key, &value)?;
                found.push(key.to_string());
            }
        }
        Ok(found)
    }

    /// Example .env content listing every supported variable
    pub fn create_example_env_content() -> String {
        let mut content = String::from("# Hub Latency Tester configuration\n#\n# Command-line flags override these values.\n\n");
        for (key, description, example) in Self::get_supported_env_vars() {
            content.push_str(&format!("# {}\n# {}={}\n\n", description, key, example));
        }
        content
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }
}
