//! Per-worker result records
//!
//! Each record is produced exactly once, when a worker's run loop ends, and
//! handed to the executor by value. Nothing mutates it afterwards.

use crate::error::AppError;
use crate::types::{TransportKind, WorkerRole};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a producer did during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerResult {
    /// Position of the worker in spawn order
    pub index: usize,
    pub connection_id: String,
    pub transport_kind: TransportKind,
    /// Successful sends
    pub sent: u64,
    /// Sends that failed or timed out
    pub failed: u64,
}

impl fmt::Display for ProducerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionId: {}, Transport: {}, Count: {}",
            self.connection_id, self.transport_kind, self.sent
        )?;
        if self.failed > 0 {
            write!(f, ", Failed: {}", self.failed)?;
        }
        Ok(())
    }
}

/// What a consumer observed during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerResult {
    pub index: usize,
    pub connection_id: String,
    pub transport_kind: TransportKind,
    /// Latency of every accepted delivery, in clock ticks, in receipt order
    #[serde(skip)]
    pub samples: Vec<u64>,
    /// Deliveries that could not be decoded or carried a future timestamp
    pub rejected: u64,
}

impl ConsumerResult {
    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

/// A worker that ended with an error instead of a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFailure {
    pub role: WorkerRole,
    pub index: usize,
    pub category: String,
    pub message: String,
}

impl WorkerFailure {
    pub fn new(role: WorkerRole, index: usize, error: &AppError) -> Self {
        Self {
            role,
            index,
            category: error.category().to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} [{}] {}", self.role, self.index, self.category, self.message)
    }
}
