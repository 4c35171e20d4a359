//! Producer and consumer workers
//!
//! Every worker is spawned as its own task, opens its own connection and owns
//! its result buffer. The only state shared between workers is the
//! [`Shutdown`] signal, the clock and the read-only run configuration.

pub mod consumer;
pub mod producer;

pub use consumer::ConsumerWorker;
pub use producer::ProducerWorker;

use crate::clock::Clock;
use crate::connection::{Connection, Connector};
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::RunConfig;
use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation signal broadcast to every worker at once
#[derive(Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Raise the signal; idempotent
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal has been raised
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of self, so this cannot fail
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a worker needs, handed over at spawn time
#[derive(Clone)]
pub struct WorkerContext {
    pub config: Arc<RunConfig>,
    pub clock: Clock,
    pub connector: Arc<dyn Connector>,
    pub shutdown: Shutdown,
    pub logger: Logger,
}

impl WorkerContext {
    /// Open a connection to the configured endpoint unless shutdown comes first
    pub async fn connect(&self) -> Result<Box<dyn Connection>> {
        tokio::select! {
            biased;
            opened = self.connector.open(&self.config.endpoint, self.config.transport) => opened,
            _ = self.shutdown.cancelled() => Err(cancelled_while_connecting()),
        }
    }
}

/// Failure reported by a worker stopped before its connection was established
pub fn cancelled_while_connecting() -> AppError {
    AppError::connection("Stopped before the connection was established")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_wakes_every_clone() {
        let shutdown = Shutdown::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let shutdown = shutdown.clone();
                tokio::spawn(async move { shutdown.cancelled().await })
            })
            .collect();

        assert!(!shutdown.is_triggered());
        shutdown.trigger();

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter did not wake")
                .unwrap();
        }
    }

    #[test]
    fn test_cancelled_pending_until_triggered() {
        let shutdown = Shutdown::new();
        let mut waiter = tokio_test::task::spawn(shutdown.cancelled());

        tokio_test::assert_pending!(waiter.poll());
        shutdown.trigger();
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_cancelled_after_trigger_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
        tokio::time::timeout(Duration::from_millis(50), shutdown.cancelled())
            .await
            .expect("already triggered");
    }
}
