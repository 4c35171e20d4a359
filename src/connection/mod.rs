//! Sessions against a broadcast hub
//!
//! Workers only see the [`Connection`] capability: invoke a remote operation,
//! subscribe to a broadcast event, and report the connection id and the
//! transport in use. [`Connector`] opens connections, either against the
//! in-process hub or against a remote hub over HTTP or a socket.

use crate::error::{AppError, Result};
use crate::models::HubFrame;
use crate::types::{TransportKind, TransportPreference};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod http;
pub mod inprocess;
pub mod websocket;

pub use http::HttpConnector;
pub use inprocess::{InProcessConnector, InProcessHub};

/// Callback run once per broadcast event delivered to a connection
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Handle returned by [`Connection::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// An established session to the broadcast endpoint
#[async_trait]
pub trait Connection: Send + Sync {
    /// Identifier assigned when the session was opened
    fn id(&self) -> &str;

    /// Transport this session settled on
    fn transport_kind(&self) -> TransportKind;

    /// Call a remote operation; returns once the hub acknowledged it
    async fn invoke(&self, operation: &str, payload: Value) -> Result<()>;

    /// Register a handler for a broadcast event
    ///
    /// Handlers may run concurrently with the caller. Events on one
    /// connection reach its handlers in the order they were delivered.
    async fn subscribe(&self, event: &str, handler: EventHandler) -> Result<SubscriptionId>;

    /// Remove a handler; once this returns the handler is not running and will
    /// not be called again
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;

    /// End the session; further invokes fail
    async fn close(&self) -> Result<()>;
}

/// Opens connections against an endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, endpoint: &str, transport: TransportPreference) -> Result<Box<dyn Connection>>;
}

/// Event handlers of one connection
///
/// Dispatch holds the read lock for the whole fan-out, so `remove` waits for
/// any in-flight delivery to finish before it returns.
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: RwLock<BTreeMap<SubscriptionId, (String, EventHandler)>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, event: &str, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().await.insert(id, (event.to_string(), handler));
        id
    }

    pub async fn remove(&self, id: SubscriptionId) -> Result<()> {
        match self.handlers.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(AppError::internal(format!("Unknown subscription {:?}", id))),
        }
    }

    pub async fn clear(&self) {
        self.handlers.write().await.clear();
    }

    /// Run every handler registered for `event`; returns how many ran
    pub async fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let handlers = self.handlers.read().await;
        let mut delivered = 0;
        for (name, handler) in handlers.values() {
            if name == event {
                handler(payload.clone());
                delivered += 1;
            }
        }
        delivered
    }

    /// Route a decoded hub frame to the handlers of its target event
    pub async fn dispatch_frame(&self, frame: HubFrame) -> usize {
        let event = frame.target.clone();
        let payload = frame.into_first_argument();
        self.dispatch(&event, &payload).await
    }

    pub async fn len(&self) -> usize {
        self.handlers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
