//! Wire shapes exchanged with the broadcast hub

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hub operation producers invoke to publish
pub const SEND_OPERATION: &str = "Send";

/// Event the hub broadcasts to every subscriber
pub const MESSAGE_EVENT: &str = "message";

/// A timestamped payload; immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Clock tick at send time
    pub timestamp: u64,
    pub body: String,
}

impl Message {
    pub fn new(timestamp: u64, body: String) -> Self {
        Self { timestamp, body }
    }

    /// Body of exactly `size` bytes
    pub fn filler_body(size: usize) -> String {
        "a".repeat(size)
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(AppError::from)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| AppError::protocol(format!("malformed message: {}", e)))
    }
}

/// Envelope for both invocations and broadcast events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubFrame {
    /// Operation name on the way in, event name on the way out
    pub target: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl HubFrame {
    pub fn new(target: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            target: target.into(),
            arguments,
        }
    }

    /// Frame carrying a single argument
    pub fn single(target: impl Into<String>, argument: Value) -> Self {
        Self::new(target, vec![argument])
    }

    /// First argument, or JSON null for argument-less frames
    pub fn into_first_argument(self) -> Value {
        self.arguments.into_iter().next().unwrap_or(Value::Null)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(AppError::from)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| AppError::protocol(format!("malformed hub frame: {}", e)))
    }
}
