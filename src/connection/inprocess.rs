//! Broadcast hub hosted inside this process
//!
//! Selected with the `local` endpoint. `Send` fans the message out to the
//! `message` handlers of every open connection before the invoke returns, so
//! a run against this hub loses nothing to the network.

use super::{Connection, Connector, EventHandler, HandlerRegistry, SubscriptionId};
use crate::error::{AppError, Result};
use crate::models::message::{MESSAGE_EVENT, SEND_OPERATION};
use crate::types::{TransportKind, TransportPreference};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shared hub every in-process connection attaches to
#[derive(Default)]
pub struct InProcessHub {
    connections: RwLock<HashMap<String, Arc<HandlerRegistry>>>,
    broadcasts: AtomicU64,
}

impl InProcessHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of connections currently attached
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of `Send` invocations fanned out so far
    pub fn broadcast_count(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    async fn attach(self: &Arc<Self>) -> InProcessConnection {
        let id = Uuid::new_v4().to_string();
        let handlers = Arc::new(HandlerRegistry::new());
        self.connections.write().await.insert(id.clone(), handlers.clone());

        InProcessConnection {
            id,
            hub: self.clone(),
            handlers,
            closed: AtomicBool::new(false),
        }
    }

    async fn detach(&self, id: &str) {
        self.connections.write().await.remove(id);
    }

    /// Deliver `event` to every attached connection; returns handler calls made
    async fn broadcast(&self, event: &str, payload: &Value) -> usize {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for handlers in connections.values() {
            delivered += handlers.dispatch(event, payload).await;
        }
        delivered
    }
}

pub struct InProcessConnection {
    id: String,
    hub: Arc<InProcessHub>,
    handlers: Arc<HandlerRegistry>,
    closed: AtomicBool,
}

impl InProcessConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::connection(format!("Connection {} is closed", self.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for InProcessConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::InProcess
    }

    async fn invoke(&self, operation: &str, payload: Value) -> Result<()> {
        self.ensure_open()?;
        match operation {
            SEND_OPERATION => {
                self.hub.broadcast(MESSAGE_EVENT, &payload).await;
                Ok(())
            }
            other => Err(AppError::send(format!("Hub has no operation '{}'", other))),
        }
    }

    async fn subscribe(&self, event: &str, handler: EventHandler) -> Result<SubscriptionId> {
        self.ensure_open()?;
        Ok(self.handlers.add(event, handler).await)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.handlers.remove(id).await
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.hub.detach(&self.id).await;
            self.handlers.clear().await;
        }
        Ok(())
    }
}

/// Opens connections on a shared [`InProcessHub`]
#[derive(Clone)]
pub struct InProcessConnector {
    hub: Arc<InProcessHub>,
}

impl InProcessConnector {
    pub fn new(hub: Arc<InProcessHub>) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &Arc<InProcessHub> {
        &self.hub
    }
}

impl Default for InProcessConnector {
    fn default() -> Self {
        Self::new(InProcessHub::new())
    }
}

#[async_trait]
impl Connector for InProcessConnector {
    /// Every transport preference maps onto direct in-process delivery
    async fn open(&self, _endpoint: &str, _transport: TransportPreference) -> Result<Box<dyn Connection>> {
        Ok(Box::new(self.hub.attach().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn counter_handler(count: Arc<Mutex<u32>>) -> EventHandler {
        Arc::new(move |_| *count.lock().unwrap() += 1)
    }

    #[tokio::test]
    async fn test_send_reaches_every_connection() {
        let connector = InProcessConnector::default();
        let sender = connector.open("local", TransportPreference::Auto).await.unwrap();
        let a = connector.open("local", TransportPreference::Auto).await.unwrap();
        let b = connector.open("local", TransportPreference::LongPoll).await.unwrap();

        let received = Arc::new(Mutex::new(0));
        a.subscribe(MESSAGE_EVENT, counter_handler(received.clone())).await.unwrap();
        b.subscribe(MESSAGE_EVENT, counter_handler(received.clone())).await.unwrap();

        sender.invoke(SEND_OPERATION, serde_json::json!({"timestamp": 1, "body": "x"})).await.unwrap();
        assert_eq!(*received.lock().unwrap(), 2);
        assert_eq!(connector.hub().connection_count().await, 3);
        assert_eq!(connector.hub().broadcast_count(), 1);
    }

    #[tokio::test]
    async fn test_sender_receives_own_broadcast() {
        let connector = InProcessConnector::default();
        let connection = connector.open("local", TransportPreference::Auto).await.unwrap();
        let received = Arc::new(Mutex::new(0));
        connection.subscribe(MESSAGE_EVENT, counter_handler(received.clone())).await.unwrap();

        connection.invoke(SEND_OPERATION, Value::Null).await.unwrap();
        assert_eq!(*received.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_operation_is_send_error() {
        let connector = InProcessConnector::default();
        let connection = connector.open("local", TransportPreference::Auto).await.unwrap();
        let err = connection.invoke("Shout", Value::Null).await.unwrap_err();
        assert_eq!(err.category(), "SEND");
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_invoke_and_detaches() {
        let connector = InProcessConnector::default();
        let connection = connector.open("local", TransportPreference::Auto).await.unwrap();
        assert_eq!(connection.transport_kind(), TransportKind::InProcess);

        connection.close().await.unwrap();
        connection.close().await.unwrap();
        assert_eq!(connector.hub().connection_count().await, 0);

        let err = connection.invoke(SEND_OPERATION, Value::Null).await.unwrap_err();
        assert_eq!(err.category(), "CONNECTION");
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let connector = InProcessConnector::default();
        let a = connector.open("local", TransportPreference::Auto).await.unwrap();
        let b = connector.open("local", TransportPreference::Auto).await.unwrap();
        assert_ne!(a.id(), b.id());
    }
}
