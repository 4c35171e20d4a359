//! Hub Latency Tester
//!
//! A concurrent load generator and end-to-end latency meter for
//! publish/subscribe broadcast hubs. Producers publish timestamped messages
//! at a fixed rate, consumers record how long each broadcast took to reach
//! them, and the run ends with per-worker counts and aggregate latency
//! statistics.

pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod stats;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use clock::Clock;
pub use connection::{Connection, Connector};
pub use error::{AppError, Result};
pub use executor::{ExecutionResults, LoadTestExecutor, StopReason};
pub use models::{ConsumerResult, Message, ProducerResult, RunConfig, WorkerFailure};
pub use output::{ColoredFormatter, OutputFormatterFactory, PlainFormatter, ReportFormatter};
pub use stats::{LatencyStatistics, ProducerStatistics};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use crate::types::DisplayUnit;
    use std::time::Duration;

    pub const DEFAULT_PRODUCERS: usize = 5;
    pub const DEFAULT_CONSUMERS: usize = 5;
    pub const DEFAULT_FREQUENCY: u32 = 100;
    pub const DEFAULT_PAYLOAD_SIZE: usize = 100;
    pub const DEFAULT_ENDPOINT: &str = "http://localhost:8123/hub";
    pub const DEFAULT_DISPLAY_UNIT: DisplayUnit = DisplayUnit::Milliseconds;
    pub const DEFAULT_DRAIN: Duration = Duration::from_millis(500);
    pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
