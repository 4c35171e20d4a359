//! Run orchestration
//!
//! [`LoadTestExecutor`] owns the lifecycle of one run:
//! - spawn consumers and wait until each is listening or has failed
//! - spawn producers
//! - wait for an external stop, the run duration, or producer completion
//! - raise the shared shutdown signal and join producers, then consumers
//! - fold the collected results into [`ExecutionResults`]

use crate::clock::Clock;
use crate::connection::Connector;
use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::{ConsumerResult, ProducerResult, RunConfig, WorkerFailure};
use crate::stats::{self, LatencyStatistics, ProducerStatistics};
use crate::types::{DisplayUnit, TransportPreference, WorkerRole};
use crate::worker::{ConsumerWorker, ProducerWorker, Shutdown, WorkerContext};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// External stop signal (Ctrl-C, a line on stdin)
    Interrupted,
    /// Every producer finished its target count
    TargetReached,
    /// The configured run duration elapsed
    DurationElapsed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => f.write_str("interrupted"),
            Self::TargetReached => f.write_str("target count reached"),
            Self::DurationElapsed => f.write_str("duration elapsed"),
        }
    }
}

/// High-level summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub stop_reason: StopReason,
    /// Wall time from first spawn to last join
    pub elapsed: Duration,
    pub endpoint: String,
    pub transport: TransportPreference,
    pub producers_requested: usize,
    pub consumers_requested: usize,
    pub frequency: u32,
    pub payload_size: usize,
    pub target_count: Option<u64>,
}

/// Complete results of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResults {
    pub summary: ExecutionSummary,
    /// Completed producers, in spawn order
    pub producers: Vec<ProducerResult>,
    /// Completed consumers, in spawn order
    pub consumers: Vec<ConsumerResult>,
    /// Per-consumer statistics, parallel to `consumers`
    pub consumer_statistics: Vec<Option<LatencyStatistics>>,
    /// Workers that ended with an error instead of a result
    pub failures: Vec<WorkerFailure>,
    pub producer_total: ProducerStatistics,
    /// `None` when no consumer received anything
    pub consumer_total: Option<LatencyStatistics>,
    /// Ticks per second of the clock the samples were taken with
    pub clock_frequency: u64,
    pub display_unit: DisplayUnit,
}

impl ExecutionResults {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Total messages received across consumers
    pub fn received(&self) -> u64 {
        self.consumer_total.map_or(0, |total| total.count)
    }
}

/// Orchestrates producers and consumers against one endpoint
pub struct LoadTestExecutor {
    config: Arc<RunConfig>,
    clock: Clock,
    connector: Arc<dyn Connector>,
    logger: Logger,
}

impl LoadTestExecutor {
    pub fn new(config: RunConfig, connector: Arc<dyn Connector>, logger: Logger) -> Self {
        Self {
            config: Arc::new(config),
            clock: Clock::system(),
            connector,
            logger,
        }
    }

    /// Use a specific clock instead of probing the host
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Execute one run; `stop` resolving is the external stop signal
    pub async fn run<F>(&self, stop: F) -> Result<ExecutionResults>
    where
        F: Future<Output = ()> + Send,
    {
        self.config.validate()?;

        let started = Instant::now();
        let shutdown = Shutdown::new();
        let context = WorkerContext {
            config: self.config.clone(),
            clock: self.clock,
            connector: self.connector.clone(),
            shutdown: shutdown.clone(),
            logger: self.logger.clone(),
        };

        tokio::pin!(stop);
        let run_timer = run_timer(self.config.duration());
        tokio::pin!(run_timer);

        self.logger
            .info("Starting run")
            .field("endpoint", &self.config.endpoint)
            .field("producers", self.config.producers)
            .field("consumers", self.config.consumers)
            .field("clock_frequency", self.clock.frequency())
            .log()
            .await;

        // Consumers first, so no early broadcast goes unheard
        let mut readiness = Vec::with_capacity(self.config.consumers);
        let consumer_handles: Vec<JoinHandle<Result<ConsumerResult>>> = (0..self.config.consumers)
            .map(|index| {
                let (ready_tx, ready_rx) = oneshot::channel();
                readiness.push(ready_rx);
                tokio::spawn(ConsumerWorker::new(index, context.clone()).run(ready_tx))
            })
            .collect();

        let early_stop = tokio::select! {
            _ = join_all(readiness) => None,
            _ = &mut stop => Some(StopReason::Interrupted),
            _ = &mut run_timer => Some(StopReason::DurationElapsed),
        };

        let (stop_reason, producer_outputs) = match early_stop {
            Some(reason) => {
                self.logger
                    .warn("Stopped before consumers were ready")
                    .field("reason", reason.to_string())
                    .log()
                    .await;
                shutdown.trigger();
                (reason, Vec::new())
            }
            None => {
                let producer_handles: Vec<JoinHandle<Result<ProducerResult>>> = (0..self.config.producers)
                    .map(|index| tokio::spawn(ProducerWorker::new(index, context.clone()).run()))
                    .collect();
                self.logger.debug("Producers spawned").field("count", producer_handles.len()).log().await;

                self.wait_for_stop(producer_handles, &shutdown, &mut stop, &mut run_timer)
                    .await
            }
        };

        self.logger
            .info("Stopping run")
            .field("reason", stop_reason.to_string())
            .log()
            .await;

        let consumer_outputs = join_all(consumer_handles).await;
        let results = self.collect(stop_reason, started.elapsed(), producer_outputs, consumer_outputs);

        for failure in &results.failures {
            self.logger
                .error("Worker failed")
                .field("role", failure.role)
                .field("index", failure.index)
                .field("error", &failure.message)
                .log()
                .await;
        }

        Ok(results)
    }

    /// Wait for the stop condition, raise shutdown, then join every producer
    async fn wait_for_stop<S, T>(
        &self,
        producer_handles: Vec<JoinHandle<Result<ProducerResult>>>,
        shutdown: &Shutdown,
        stop: &mut std::pin::Pin<&mut S>,
        run_timer: &mut std::pin::Pin<&mut T>,
    ) -> (StopReason, Vec<std::result::Result<Result<ProducerResult>, tokio::task::JoinError>>)
    where
        S: Future<Output = ()>,
        T: Future<Output = ()>,
    {
        let producers_done = join_all(producer_handles);
        tokio::pin!(producers_done);

        let mut finished = None;
        let reason = if self.config.target_count.is_some() {
            tokio::select! {
                outputs = &mut producers_done => {
                    finished = Some(outputs);
                    StopReason::TargetReached
                }
                _ = stop.as_mut() => StopReason::Interrupted,
                _ = run_timer.as_mut() => StopReason::DurationElapsed,
            }
        } else {
            tokio::select! {
                _ = stop.as_mut() => StopReason::Interrupted,
                _ = run_timer.as_mut() => StopReason::DurationElapsed,
            }
        };

        if reason == StopReason::TargetReached {
            // Let in-flight broadcasts land before cutting consumers off
            tokio::select! {
                _ = tokio::time::sleep(self.config.drain()) => {}
                _ = stop.as_mut() => {}
            }
        }

        shutdown.trigger();
        let outputs = match finished {
            Some(outputs) => outputs,
            None => producers_done.await,
        };
        (reason, outputs)
    }

    fn collect(
        &self,
        stop_reason: StopReason,
        elapsed: Duration,
        producer_outputs: Vec<std::result::Result<Result<ProducerResult>, tokio::task::JoinError>>,
        consumer_outputs: Vec<std::result::Result<Result<ConsumerResult>, tokio::task::JoinError>>,
    ) -> ExecutionResults {
        let mut failures = Vec::new();

        let producers: Vec<ProducerResult> = producer_outputs
            .into_iter()
            .enumerate()
            .filter_map(|(index, output)| match flatten(output) {
                Ok(result) => Some(result),
                Err(e) => {
                    failures.push(WorkerFailure::new(WorkerRole::Producer, index, &e));
                    None
                }
            })
            .collect();

        let consumers: Vec<ConsumerResult> = consumer_outputs
            .into_iter()
            .enumerate()
            .filter_map(|(index, output)| match flatten(output) {
                Ok(result) => Some(result),
                Err(e) => {
                    failures.push(WorkerFailure::new(WorkerRole::Consumer, index, &e));
                    None
                }
            })
            .collect();

        let consumer_statistics = consumers.iter().map(stats::consumer_statistics).collect();

        ExecutionResults {
            summary: ExecutionSummary {
                stop_reason,
                elapsed,
                endpoint: self.config.endpoint.clone(),
                transport: self.config.transport,
                producers_requested: self.config.producers,
                consumers_requested: self.config.consumers,
                frequency: self.config.frequency,
                payload_size: self.config.payload_size,
                target_count: self.config.target_count,
            },
            producer_total: stats::aggregate_producers(&producers),
            consumer_total: stats::aggregate_consumers(&consumers),
            producers,
            consumers,
            consumer_statistics,
            failures,
            clock_frequency: self.clock.frequency(),
            display_unit: self.config.display_unit,
        }
    }
}

fn flatten<T>(output: std::result::Result<Result<T>, tokio::task::JoinError>) -> Result<T> {
    output.map_err(AppError::from)?
}

async fn run_timer(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
