//! Consumer worker: records end-to-end latency of every broadcast it receives

use super::{cancelled_while_connecting, WorkerContext};
use crate::connection::{Connection, EventHandler};
use crate::error::Result;
use crate::logging::Logger;
use crate::models::message::MESSAGE_EVENT;
use crate::models::{ConsumerResult, Message};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Buffer the delivery handler appends to while the worker listens
#[derive(Default)]
struct SampleSink {
    samples: Mutex<Vec<u64>>,
    rejected: AtomicU64,
}

impl SampleSink {
    fn record(&self, latency: u64) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(latency);
    }

    fn reject(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn take(&self) -> (Vec<u64>, u64) {
        let samples = std::mem::take(&mut *self.samples.lock().unwrap_or_else(PoisonError::into_inner));
        (samples, self.rejected.load(Ordering::Relaxed))
    }
}

pub struct ConsumerWorker {
    index: usize,
    context: WorkerContext,
    logger: Logger,
}

impl ConsumerWorker {
    pub fn new(index: usize, context: WorkerContext) -> Self {
        let logger = context.logger.child(format!("consumer-{}", index));
        Self { index, context, logger }
    }

    /// Connect, subscribe, signal `ready`, then listen until cancelled
    ///
    /// `ready` is dropped without a value if the worker fails before it is
    /// listening.
    pub async fn run(self, ready: oneshot::Sender<()>) -> Result<ConsumerResult> {
        let connection = match self.context.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                self.logger.error("Connection failed").error_info(&e).log().await;
                return Err(e);
            }
        };

        let sink = Arc::new(SampleSink::default());
        let subscribed = tokio::select! {
            biased;
            subscribed = connection.subscribe(MESSAGE_EVENT, self.handler(sink.clone())) => subscribed,
            _ = self.context.shutdown.cancelled() => Err(cancelled_while_connecting()),
        };
        let subscription = match subscribed {
            Ok(subscription) => subscription,
            Err(e) => {
                self.logger.error("Subscribe failed").error_info(&e).log().await;
                let _ = connection.close().await;
                return Err(e);
            }
        };

        self.logger
            .info("Listening")
            .field("connection_id", connection.id())
            .field("transport", connection.transport_kind().to_string())
            .log()
            .await;
        let _ = ready.send(());

        self.context.shutdown.cancelled().await;

        // Quiesce delivery before reading the buffer
        if let Err(e) = connection.unsubscribe(subscription).await {
            self.logger.debug("Unsubscribe failed").error_info(&e).log().await;
        }
        self.close(connection.as_ref()).await;

        let (samples, rejected) = sink.take();
        self.logger
            .info("Stopped")
            .field("received", samples.len())
            .field("rejected", rejected)
            .log()
            .await;

        Ok(ConsumerResult {
            index: self.index,
            connection_id: connection.id().to_string(),
            transport_kind: connection.transport_kind(),
            samples,
            rejected,
        })
    }

    /// Handler computing `now - message.timestamp` for each delivery
    ///
    /// Undecodable messages and timestamps ahead of the clock are counted as
    /// rejected instead of recorded.
    fn handler(&self, sink: Arc<SampleSink>) -> EventHandler {
        let clock = self.context.clock;
        Arc::new(move |payload| {
            let received = clock.now();
            match Message::from_value(payload) {
                Ok(message) if message.timestamp <= received => sink.record(received - message.timestamp),
                _ => sink.reject(),
            }
        })
    }

    async fn close(&self, connection: &dyn Connection) {
        if let Err(e) = connection.close().await {
            self.logger.debug("Close failed").error_info(&e).log().await;
        }
    }
}
