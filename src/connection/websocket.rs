//! Full-duplex socket transport
//!
//! After negotiation the connection upgrades to `ws(s)://{endpoint}/ws?id=..`.
//! Hub frames travel as text messages in both directions.

use super::{Connection, EventHandler, HandlerRegistry, SubscriptionId};
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::HubFrame;
use crate::types::TransportKind;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket URL for a negotiated connection
pub fn socket_url(base: &Url, connection_id: &str) -> Result<Url> {
    let mut url = super::http::route_url(base, "ws", Some(connection_id))?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| AppError::config(format!("Cannot derive socket URL from {}", base)))?;
    Ok(url)
}

pub struct WebSocketConnection {
    id: String,
    writer: Mutex<SplitSink<Socket, WsMessage>>,
    handlers: Arc<HandlerRegistry>,
    reader: Mutex<Option<JoinHandle<()>>>,
    closed: Arc<AtomicBool>,
}

impl WebSocketConnection {
    pub async fn connect(
        base: &Url,
        connection_id: String,
        handlers: Arc<HandlerRegistry>,
        connect_timeout: Duration,
        logger: Logger,
    ) -> Result<Self> {
        let url = socket_url(base, &connection_id)?;
        let (socket, _response) = tokio::time::timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| AppError::timeout(format!("Socket upgrade to {} timed out after {:?}", url, connect_timeout)))?
            .map_err(|e| AppError::connection(format!("Socket upgrade to {} failed: {}", url, e)))?;

        let (writer, reader) = socket.split();
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(reader, handlers.clone(), closed.clone(), logger));

        Ok(Self {
            id: connection_id,
            writer: Mutex::new(writer),
            handlers,
            reader: Mutex::new(Some(reader)),
            closed,
        })
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::WebSockets
    }

    async fn invoke(&self, operation: &str, payload: Value) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::connection(format!("Connection {} is closed", self.id)));
        }

        let text = HubFrame::single(operation, payload).to_json()?;
        self.writer.lock().await.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    async fn subscribe(&self, event: &str, handler: EventHandler) -> Result<SubscriptionId> {
        Ok(self.handlers.add(event, handler).await)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.handlers.remove(id).await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        self.handlers.clear().await;
        let _ = self.writer.lock().await.send(WsMessage::Close(None)).await;
        Ok(())
    }
}

async fn read_loop(
    mut reader: SplitStream<Socket>,
    handlers: Arc<HandlerRegistry>,
    closed: Arc<AtomicBool>,
    logger: Logger,
) {
    while let Some(message) = reader.next().await {
        match message {
            Ok(WsMessage::Text(text)) => match HubFrame::from_json(&text) {
                Ok(frame) => {
                    handlers.dispatch_frame(frame).await;
                }
                Err(e) => logger.debug("Skipping frame").error_info(&e).log().await,
            },
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                let error = AppError::from(e);
                logger.warn("Socket read failed").error_info(&error).log().await;
                break;
            }
        }
    }
    closed.store(true, Ordering::Release);
}
