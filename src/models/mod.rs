//! Data models shared by the workers, the aggregator and the report

pub mod config;
pub mod message;
pub mod results;

// Re-export main model types
pub use config::RunConfig;
pub use message::{HubFrame, Message};
pub use results::{ConsumerResult, ProducerResult, WorkerFailure};
