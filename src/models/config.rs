//! Run configuration data model and validation

use crate::logging::{LogFormat, LogLevel};
use crate::types::{AppError, DisplayUnit, Result, TransportPreference};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Endpoint selector for the hub hosted inside this process
pub const LOCAL_ENDPOINT: &str = "local";

/// Largest payload a producer may be asked to send (16 MiB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Largest send rate per producer, in messages per second
pub const MAX_FREQUENCY: u32 = 100_000;

/// Largest population of either worker kind
pub const MAX_WORKERS: usize = 10_000;

/// Immutable snapshot of everything a run needs
///
/// Built once by the config parser and shared read-only with every worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of producer workers
    #[serde(default = "default_producers")]
    pub producers: usize,

    /// Number of consumer workers
    #[serde(default = "default_consumers")]
    pub consumers: usize,

    /// Messages per second sent by each producer
    #[serde(default = "default_frequency")]
    pub frequency: u32,

    /// Length of each message body in bytes
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,

    /// Broadcast endpoint address, or `local` for the in-process hub
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Unit latency values are reported in
    #[serde(default = "default_display_unit")]
    pub display_unit: DisplayUnit,

    /// Transport each connection should use
    #[serde(default)]
    pub transport: TransportPreference,

    /// Stop each producer after this many successful sends
    #[serde(default)]
    pub target_count: Option<u64>,

    /// Stop the whole run after this many seconds
    #[serde(default)]
    pub duration_secs: Option<u64>,

    /// Grace period between target completion and cutting off consumers
    #[serde(default = "default_drain_ms")]
    pub drain_ms: u64,

    /// Upper bound for a single remote invocation
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Emit the final report as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Explicit log level, overriding the verbose/debug derived one
    #[serde(default)]
    pub log_level: Option<LogLevel>,

    /// Log line format
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            producers: default_producers(),
            consumers: default_consumers(),
            frequency: default_frequency(),
            payload_size: default_payload_size(),
            endpoint: default_endpoint(),
            display_unit: default_display_unit(),
            transport: TransportPreference::default(),
            target_count: None,
            duration_secs: None,
            drain_ms: default_drain_ms(),
            send_timeout_secs: default_send_timeout_secs(),
            enable_color: default_enable_color(),
            json_output: false,
            verbose: false,
            debug: false,
            log_level: None,
            log_format: default_log_format(),
        }
    }
}

impl RunConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between two sends of one producer
    pub fn send_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.frequency.max(1)))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }

    /// Whether the endpoint selects the in-process hub
    pub fn is_local_endpoint(&self) -> bool {
        self.endpoint == LOCAL_ENDPOINT || self.endpoint.starts_with("inproc://")
    }

    /// Validate the configuration and return the first error found
    pub fn validate(&self) -> Result<()> {
        if self.producers == 0 && self.consumers == 0 {
            return Err(AppError::config("At least one producer or consumer is required"));
        }

        if self.producers > MAX_WORKERS {
            return Err(AppError::config(format!("Producer count cannot exceed {}", MAX_WORKERS)));
        }

        if self.consumers > MAX_WORKERS {
            return Err(AppError::config(format!("Consumer count cannot exceed {}", MAX_WORKERS)));
        }

        if self.frequency == 0 {
            return Err(AppError::config("Frequency must be greater than 0"));
        }

        if self.frequency > MAX_FREQUENCY {
            return Err(AppError::config(format!(
                "Frequency cannot exceed {} messages per second",
                MAX_FREQUENCY
            )));
        }

        if self.payload_size > MAX_PAYLOAD_SIZE {
            return Err(AppError::config(format!(
                "Payload size cannot exceed {} bytes",
                MAX_PAYLOAD_SIZE
            )));
        }

        if self.target_count == Some(0) {
            return Err(AppError::config("Target count must be greater than 0"));
        }

        if self.duration_secs == Some(0) {
            return Err(AppError::config("Duration must be greater than 0"));
        }

        if self.send_timeout_secs == 0 {
            return Err(AppError::config("Send timeout must be greater than 0"));
        }

        self.validate_endpoint()
    }

    fn validate_endpoint(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(AppError::config("Endpoint cannot be empty"));
        }

        if self.is_local_endpoint() {
            return Ok(());
        }

        let parsed = url::Url::parse(&self.endpoint)
            .map_err(|e| AppError::config(format!("Invalid endpoint '{}': {}", self.endpoint, e)))?;

        match parsed.scheme() {
            "http" | "https" | "ws" | "wss" => Ok(()),
            other => Err(AppError::config(format!(
                "Unsupported endpoint scheme '{}' in '{}'",
                other, self.endpoint
            ))),
        }
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Some(producers) = env_parse("HUB_PRODUCERS")? {
            self.producers = producers;
        }

        if let Some(consumers) = env_parse("HUB_CONSUMERS")? {
            self.consumers = consumers;
        }

        if let Some(frequency) = env_parse("HUB_FREQUENCY")? {
            self.frequency = frequency;
        }

        if let Some(size) = env_parse("HUB_PAYLOAD_SIZE")? {
            self.payload_size = size;
        }

        if let Ok(endpoint) = std::env::var("HUB_ENDPOINT") {
            self.endpoint = endpoint.trim().to_string();
        }

        if let Ok(unit) = std::env::var("HUB_DISPLAY_UNIT") {
            self.display_unit = unit.parse()?;
        }

        if let Ok(transport) = std::env::var("HUB_TRANSPORT") {
            self.transport = transport.parse()?;
        }

        if let Some(count) = env_parse("HUB_TARGET_COUNT")? {
            self.target_count = Some(count);
        }

        if let Some(duration) = env_parse("HUB_DURATION_SECS")? {
            self.duration_secs = Some(duration);
        }

        if let Some(enable_color) = env_parse("ENABLE_COLOR")? {
            self.enable_color = enable_color;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log_level = Some(level.parse()?);
        }

        Ok(())
    }
}

/// Read and parse an environment variable, `None` when it is unset
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

// Default value functions for serde
fn default_producers() -> usize {
    crate::defaults::DEFAULT_PRODUCERS
}

fn default_consumers() -> usize {
    crate::defaults::DEFAULT_CONSUMERS
}

fn default_frequency() -> u32 {
    crate::defaults::DEFAULT_FREQUENCY
}

fn default_payload_size() -> usize {
    crate::defaults::DEFAULT_PAYLOAD_SIZE
}

fn default_endpoint() -> String {
    crate::defaults::DEFAULT_ENDPOINT.to_string()
}

fn default_display_unit() -> DisplayUnit {
    crate::defaults::DEFAULT_DISPLAY_UNIT
}

fn default_drain_ms() -> u64 {
    crate::defaults::DEFAULT_DRAIN.as_millis() as u64
}

fn default_send_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_SEND_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

fn default_log_format() -> LogFormat {
    LogFormat::Console
}
