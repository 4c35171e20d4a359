//! Type definitions shared across the harness

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Transport the user asks a connection to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportPreference {
    /// Let the hub negotiation pick the best transport it offers
    #[default]
    Auto,
    /// Repeated HTTP long-poll requests
    LongPoll,
    /// One-way server push over an event stream
    ServerPushStream,
    /// Bidirectional socket
    FullDuplexSocket,
}

impl TransportPreference {
    /// Canonical selector string, as accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::LongPoll => "long-poll",
            Self::ServerPushStream => "server-push-stream",
            Self::FullDuplexSocket => "full-duplex-socket",
        }
    }

    /// The concrete transport an explicit preference maps to, `None` for auto
    pub fn required_kind(&self) -> Option<TransportKind> {
        match self {
            Self::Auto => None,
            Self::LongPoll => Some(TransportKind::LongPolling),
            Self::ServerPushStream => Some(TransportKind::ServerSentEvents),
            Self::FullDuplexSocket => Some(TransportKind::WebSockets),
        }
    }
}

impl FromStr for TransportPreference {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "auto" => Ok(Self::Auto),
            "long-poll" | "longpolling" => Ok(Self::LongPoll),
            "server-push-stream" | "sse" | "serversentevents" => Ok(Self::ServerPushStream),
            "full-duplex-socket" | "websocket" | "websockets" | "ws" => Ok(Self::FullDuplexSocket),
            other => Err(AppError::config(format!(
                "Unknown transport '{}' (expected auto, long-poll, server-push-stream or full-duplex-socket)",
                other
            ))),
        }
    }
}

impl fmt::Display for TransportPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport actually in use by an established connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportKind {
    LongPolling,
    ServerSentEvents,
    WebSockets,
    /// Direct calls into a hub living in this process
    InProcess,
}

impl TransportKind {
    /// Name used by hub negotiation responses
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::LongPolling => "longPolling",
            Self::ServerSentEvents => "serverSentEvents",
            Self::WebSockets => "webSockets",
            Self::InProcess => "inProcess",
        }
    }

    /// Parse a negotiation name, ignoring transports we do not speak
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "longPolling" => Some(Self::LongPolling),
            "serverSentEvents" => Some(Self::ServerSentEvents),
            "webSockets" => Some(Self::WebSockets),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LongPolling => "LongPolling",
            Self::ServerSentEvents => "ServerSentEvents",
            Self::WebSockets => "WebSockets",
            Self::InProcess => "InProcess",
        };
        f.write_str(name)
    }
}

/// Unit latency values are displayed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    /// Raw clock ticks, the explicit fallback
    #[default]
    Ticks,
    Seconds,
    Milliseconds,
    Microseconds,
}

impl DisplayUnit {
    /// Look up a selector; `None` for anything unknown
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector.trim() {
            "ticks" | "t" => Some(Self::Ticks),
            "seconds" | "s" => Some(Self::Seconds),
            "milliseconds" | "ms" | "m" => Some(Self::Milliseconds),
            "microseconds" | "us" => Some(Self::Microseconds),
            _ => None,
        }
    }

    /// Multiplier applied before dividing by the clock frequency
    pub fn scale(&self) -> f64 {
        match self {
            Self::Ticks | Self::Seconds => 1.0,
            Self::Milliseconds => 1e3,
            Self::Microseconds => 1e6,
        }
    }

    /// Convert a tick count into this unit
    ///
    /// Ticks are returned unchanged; every other unit goes through
    /// `ticks * scale / frequency`.
    pub fn convert(&self, ticks: u64, frequency: u64) -> f64 {
        match self {
            Self::Ticks => ticks as f64,
            _ => ticks as f64 * self.scale() / frequency as f64,
        }
    }

    /// Short suffix for rendered values
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Ticks => "ticks",
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "us",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticks => "ticks",
            Self::Seconds => "seconds",
            Self::Milliseconds => "milliseconds",
            Self::Microseconds => "microseconds",
        }
    }
}

impl FromStr for DisplayUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_selector(s).ok_or_else(|| {
            AppError::config(format!(
                "Unknown display unit '{}' (expected ticks, seconds, milliseconds or microseconds)",
                s
            ))
        })
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the hub a worker plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    Producer,
    Consumer,
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => f.write_str("producer"),
            Self::Consumer => f.write_str("consumer"),
        }
    }
}
