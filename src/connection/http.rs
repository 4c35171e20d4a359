//! Remote hub connector over HTTP
//!
//! Opening a connection negotiates a connection id and transport with
//! `POST {endpoint}/negotiate`. Invocations are posted as hub frames; events
//! arrive through a background receive task that long-polls, reads a
//! server-sent event stream, or (for sockets) is handed off to
//! [`super::websocket`].

use super::{websocket, Connection, Connector, EventHandler, HandlerRegistry, SubscriptionId};
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::config::MAX_PAYLOAD_SIZE;
use crate::models::HubFrame;
use crate::types::{TransportKind, TransportPreference};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

/// Order `auto` tries transports in
const AUTO_ORDER: [TransportKind; 3] = [
    TransportKind::WebSockets,
    TransportKind::ServerSentEvents,
    TransportKind::LongPolling,
];

/// Pause before re-polling after a failed poll request
const POLL_RETRY_DELAY: Duration = Duration::from_millis(250);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NegotiateResponse {
    connection_id: String,
    #[serde(default)]
    available_transports: Vec<String>,
}

/// Pick the transport to use from what the hub offers
pub fn select_transport(preference: TransportPreference, offered: &[TransportKind]) -> Result<TransportKind> {
    match preference.required_kind() {
        Some(kind) if offered.contains(&kind) => Ok(kind),
        Some(kind) => Err(AppError::connection(format!(
            "Hub does not offer the {} transport",
            kind
        ))),
        None => AUTO_ORDER
            .iter()
            .copied()
            .find(|kind| offered.contains(kind))
            .ok_or_else(|| AppError::connection("Hub offered no supported transport")),
    }
}

/// Normalize an endpoint into the HTTP base URL the hub routes hang off
pub fn hub_base_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint.trim_end_matches('/'))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "http",
        "https" | "wss" => "https",
        other => {
            return Err(AppError::config(format!("Unsupported endpoint scheme '{}'", other)));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| AppError::config(format!("Cannot use endpoint '{}'", endpoint)))?;
    url.set_query(None);
    Ok(url)
}

/// `{base}/{route}?id={connection_id}`
pub fn route_url(base: &Url, route: &str, connection_id: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/{}", base.as_str().trim_end_matches('/'), route))?;
    if let Some(id) = connection_id {
        url.query_pairs_mut().append_pair("id", id);
    }
    Ok(url)
}

/// Connector for hubs reachable over HTTP(S) or WS(S)
#[derive(Clone)]
pub struct HttpConnector {
    client: Client,
    send_timeout: Duration,
    logger: Logger,
}

impl HttpConnector {
    pub fn new(send_timeout: Duration, logger: Logger) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            send_timeout,
            logger,
        })
    }

    async fn negotiate(&self, base: &Url) -> Result<NegotiateResponse> {
        let url = route_url(base, "negotiate", None)?;
        let response = self
            .client
            .post(url)
            .timeout(self.send_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::connection(format!("Negotiation with {} failed: {}", base, e)))?;

        response
            .json::<NegotiateResponse>()
            .await
            .map_err(|e| AppError::protocol(format!("Malformed negotiate response: {}", e)))
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn open(&self, endpoint: &str, transport: TransportPreference) -> Result<Box<dyn Connection>> {
        let base = hub_base_url(endpoint)?;
        let negotiation = self.negotiate(&base).await?;

        let offered: Vec<TransportKind> = negotiation
            .available_transports
            .iter()
            .filter_map(|name| TransportKind::from_wire_name(name))
            .collect();
        let kind = select_transport(transport, &offered)?;

        self.logger
            .debug("Negotiated connection")
            .field("connection_id", &negotiation.connection_id)
            .field("transport", kind.wire_name())
            .log()
            .await;

        let handlers = Arc::new(HandlerRegistry::new());
        let logger = self.logger.child(format!("connection-{}", negotiation.connection_id));

        if kind == TransportKind::WebSockets {
            let connection = websocket::WebSocketConnection::connect(
                &base,
                negotiation.connection_id,
                handlers,
                self.send_timeout,
                logger,
            )
            .await?;
            return Ok(Box::new(connection));
        }

        let receiver = match kind {
            TransportKind::ServerSentEvents => {
                let url = route_url(&base, "sse", Some(&negotiation.connection_id))?;
                tokio::spawn(sse_loop(self.client.clone(), url, handlers.clone(), logger.clone()))
            }
            _ => {
                let url = route_url(&base, "poll", Some(&negotiation.connection_id))?;
                tokio::spawn(poll_loop(self.client.clone(), url, handlers.clone(), logger.clone()))
            }
        };

        Ok(Box::new(HttpConnection {
            id: negotiation.connection_id,
            kind,
            client: self.client.clone(),
            base,
            send_timeout: self.send_timeout,
            handlers,
            receiver: Mutex::new(Some(receiver)),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Connection using long-poll or server-sent events for delivery
pub struct HttpConnection {
    id: String,
    kind: TransportKind,
    client: Client,
    base: Url,
    send_timeout: Duration,
    handlers: Arc<HandlerRegistry>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for HttpConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn transport_kind(&self) -> TransportKind {
        self.kind
    }

    async fn invoke(&self, operation: &str, payload: Value) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AppError::connection(format!("Connection {} is closed", self.id)));
        }

        let url = route_url(&self.base, "send", Some(&self.id))?;
        let frame = HubFrame::single(operation, payload);
        let response = self
            .client
            .post(url)
            .timeout(self.send_timeout)
            .json(&frame)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::send(format!(
                "Hub rejected '{}' with status {}",
                operation,
                response.status()
            )))
        }
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

        if let Some(receiver) = self.receiver.lock().await.take() {
            receiver.abort();
        }
        self.handlers.clear().await;

        // Best effort; the hub drops idle connections on its own
        if let Ok(url) = route_url(&self.base, "abort", Some(&self.id)) {
            let _ = self.client.post(url).timeout(self.send_timeout).send().await;
        }
        Ok(())
    }
}

async fn poll_loop(client: Client, url: Url, handlers: Arc<HandlerRegistry>, logger: Logger) {
    loop {
        let response = match client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                logger.debug("Poll request failed").field("error", e.to_string()).log().await;
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        match response.status() {
            StatusCode::NO_CONTENT => continue,
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                logger.warn("Hub dropped the connection").log().await;
                return;
            }
            status if !status.is_success() => {
                logger.debug("Poll rejected").field("status", status.as_u16()).log().await;
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
            _ => {}
        }

        match response.json::<Vec<HubFrame>>().await {
            Ok(frames) => {
                for frame in frames {
                    handlers.dispatch_frame(frame).await;
                }
            }
            Err(e) => {
                logger.warn("Malformed poll response").field("error", e.to_string()).log().await;
            }
        }
    }
}

async fn sse_loop(client: Client, url: Url, handlers: Arc<HandlerRegistry>, logger: Logger) {
    let response = match client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(response) => response,
        Err(e) => {
            logger.error("Event stream failed to open").field("error", e.to_string()).log().await;
            return;
        }
    };

    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                logger.warn("Event stream interrupted").field("error", e.to_string()).log().await;
                return;
            }
        };

        for data in decoder.push(&chunk) {
            match HubFrame::from_json(&data) {
                Ok(frame) => {
                    handlers.dispatch_frame(frame).await;
                }
                Err(e) => logger.debug("Skipping event").error_info(&e).log().await,
            }
        }
        if let Some(bytes) = decoder.take_discarded() {
            let error = AppError::protocol(format!("Unterminated event exceeded {} bytes", MAX_EVENT_SIZE));
            logger.warn("Discarded oversized event").field("bytes", bytes).error_info(&error).log().await;
        }
    }
    logger.debug("Event stream closed by hub").log().await;
}

/// Longest unterminated event the decoder buffers before discarding it
pub const MAX_EVENT_SIZE: usize = MAX_PAYLOAD_SIZE + 64 * 1024;

/// Incremental `text/event-stream` parser yielding each event's data
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    limit: usize,
    discarded: Option<usize>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_EVENT_SIZE)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
            discarded: None,
        }
    }

    /// Feed a chunk; returns the data of every event it completed
    ///
    /// An unterminated event growing past the limit is dropped; see
    /// [`SseDecoder::take_discarded`].
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&block[..end]);
            let data: Vec<&str> = text
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|d| d.strip_prefix(' ').unwrap_or(d))
                .collect();
            if !data.is_empty() {
                events.push(data.join("\n"));
            }
        }

        if self.buffer.len() > self.limit {
            self.discarded = Some(self.discarded.unwrap_or(0) + self.buffer.len());
            self.buffer = Vec::new();
        }
        events
    }

    /// Bytes dropped for overflowing the limit since the last call
    pub fn take_discarded(&mut self) -> Option<usize> {
        self.discarded.take()
    }
}
