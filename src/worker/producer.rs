//! Producer worker: publishes timestamped messages at a fixed rate

use super::WorkerContext;
use crate::connection::Connection;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::message::SEND_OPERATION;
use crate::models::{Message, ProducerResult};

pub struct ProducerWorker {
    index: usize,
    context: WorkerContext,
    logger: Logger,
}

impl ProducerWorker {
    pub fn new(index: usize, context: WorkerContext) -> Self {
        let logger = context.logger.child(format!("producer-{}", index));
        Self { index, context, logger }
    }

    /// Connect, send until cancelled or the target is reached, then report
    ///
    /// Only a failed connect ends the worker with an error; failed sends are
    /// logged and counted.
    pub async fn run(self) -> Result<ProducerResult> {
        let connection = match self.context.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                self.logger.error("Connection failed").error_info(&e).log().await;
                return Err(e);
            }
        };

        self.logger
            .info("Connected")
            .field("connection_id", connection.id())
            .field("transport", connection.transport_kind().to_string())
            .log()
            .await;

        let (sent, failed) = self.send_loop(connection.as_ref()).await;

        if let Err(e) = connection.close().await {
            self.logger.debug("Close failed").error_info(&e).log().await;
        }

        self.logger
            .info("Stopped")
            .field("sent", sent)
            .field("failed", failed)
            .log()
            .await;

        Ok(ProducerResult {
            index: self.index,
            connection_id: connection.id().to_string(),
            transport_kind: connection.transport_kind(),
            sent,
            failed,
        })
    }

    async fn send_loop(&self, connection: &dyn Connection) -> (u64, u64) {
        let config = &self.context.config;
        let shutdown = &self.context.shutdown;
        let body = Message::filler_body(config.payload_size);
        let interval = config.send_interval();

        let mut sent = 0u64;
        let mut failed = 0u64;

        while !shutdown.is_triggered() {
            let message = Message::new(self.context.clock.now(), body.clone());

            // A send still in flight at shutdown is dropped and counted nowhere
            let outcome = tokio::select! {
                outcome = self.send(connection, &message) => outcome,
                _ = shutdown.cancelled() => break,
            };

            match outcome {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    self.logger
                        .warn("Send failed")
                        .field("attempt", sent + failed)
                        .error_info(&e)
                        .field("error", e.to_string())
                        .log()
                        .await;
                }
            }

            if config.target_count.is_some_and(|target| sent >= target) {
                self.logger.debug("Target reached").field("sent", sent).log().await;
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        (sent, failed)
    }

    async fn send(&self, connection: &dyn Connection, message: &Message) -> Result<()> {
        let timeout = self.context.config.send_timeout();
        let payload = message.to_value()?;
        match tokio::time::timeout(timeout, connection.invoke(SEND_OPERATION, payload)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::timeout(format!("Send timed out after {:?}", timeout))),
        }
    }
}
