//! Report rendering
//!
//! The report follows the run lifecycle: header, run summary, each producer,
//! the producer total, each consumer, the consumer total, then any worker
//! failures. Latencies are shown in the configured display unit. `--json`
//! swaps all of that for a single JSON document.

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter, LatencyLevel};
pub use formatter::{FormattingOptions, PlainFormatter, ReportFormatter};

use crate::{
    error::Result,
    executor::{ExecutionResults, ExecutionSummary},
    models::{ConsumerResult, ProducerResult, WorkerFailure},
    stats::{DisplayStatistics, ProducerStatistics},
    types::DisplayUnit,
};
use serde::Serialize;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn ReportFormatter + Send + Sync> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..Default::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Plain text formatter for scripts and logs
    pub fn create_plain_formatter() -> Box<dyn ReportFormatter + Send + Sync> {
        Self::create_formatter(false, false)
    }
}

/// Assembles complete reports from a formatter
pub struct OutputCoordinator {
    formatter: Box<dyn ReportFormatter + Send + Sync>,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn ReportFormatter + Send + Sync>) -> Self {
        Self { formatter }
    }

    pub fn formatter(&self) -> &dyn ReportFormatter {
        self.formatter.as_ref()
    }

    /// Human-readable report
    pub fn display_results(&self, results: &ExecutionResults) -> Result<String> {
        let unit = results.display_unit;
        let frequency = results.clock_frequency;
        let mut sections = Vec::new();

        sections.push(self.formatter.format_header("Hub Latency Test Results")?);
        sections.push(self.formatter.format_summary(&results.summary, frequency)?);

        let mut producers = Vec::with_capacity(results.producers.len() + 1);
        for producer in &results.producers {
            producers.push(self.formatter.format_producer(producer)?);
        }
        producers.push(self.formatter.format_producer_total(&results.producer_total)?);
        sections.push(producers.join("\n"));

        let mut consumers = Vec::with_capacity(results.consumers.len() + 1);
        for (consumer, stats) in results.consumers.iter().zip(&results.consumer_statistics) {
            let shown = stats.map(|s| s.in_unit(unit, frequency));
            consumers.push(self.formatter.format_consumer(consumer, shown.as_ref())?);
        }
        let total = results.consumer_total.map(|s| s.in_unit(unit, frequency));
        consumers.push(
            self.formatter
                .format_consumer_total(total.as_ref(), results.consumers.len())?,
        );
        sections.push(consumers.join("\n"));

        if results.has_failures() {
            sections.push(self.formatter.format_failures(&results.failures)?);
        }

        Ok(sections.join("\n\n"))
    }
}

/// Serialized shape of `--json` output
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub summary: &'a ExecutionSummary,
    pub display_unit: DisplayUnit,
    pub clock_frequency: u64,
    pub producers: &'a [ProducerResult],
    pub producer_total: &'a ProducerStatistics,
    pub consumers: Vec<JsonConsumer<'a>>,
    pub consumer_total: Option<DisplayStatistics>,
    pub failures: &'a [WorkerFailure],
}

#[derive(Debug, Serialize)]
pub struct JsonConsumer<'a> {
    #[serde(flatten)]
    pub result: &'a ConsumerResult,
    pub count: usize,
    pub statistics: Option<DisplayStatistics>,
}

impl<'a> JsonReport<'a> {
    pub fn new(results: &'a ExecutionResults) -> Self {
        let unit = results.display_unit;
        let frequency = results.clock_frequency;

        Self {
            summary: &results.summary,
            display_unit: unit,
            clock_frequency: frequency,
            producers: &results.producers,
            producer_total: &results.producer_total,
            consumers: results
                .consumers
                .iter()
                .zip(&results.consumer_statistics)
                .map(|(result, stats)| JsonConsumer {
                    result,
                    count: result.count(),
                    statistics: stats.map(|s| s.in_unit(unit, frequency)),
                })
                .collect(),
            consumer_total: results.consumer_total.map(|s| s.in_unit(unit, frequency)),
            failures: &results.failures,
        }
    }

    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
