//! Core report formatting trait and the plain text implementation

use crate::{
    error::{AppError, Result},
    executor::ExecutionSummary,
    models::{ConsumerResult, ProducerResult, WorkerFailure},
    stats::{DisplayStatistics, ProducerStatistics},
    types::DisplayUnit,
};
use std::fmt::Write as _;
use std::time::Duration;

/// Renders the sections of a run report
pub trait ReportFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Run configuration, stop reason and elapsed time
    fn format_summary(&self, summary: &ExecutionSummary, clock_frequency: u64) -> Result<String>;

    /// One producer's line
    fn format_producer(&self, result: &ProducerResult) -> Result<String>;

    fn format_producer_total(&self, total: &ProducerStatistics) -> Result<String>;

    /// One consumer's line; `stats` is `None` when it received nothing
    fn format_consumer(&self, result: &ConsumerResult, stats: Option<&DisplayStatistics>) -> Result<String>;

    /// Aggregate over all consumers that completed
    fn format_consumer_total(&self, total: Option<&DisplayStatistics>, consumers: usize) -> Result<String>;

    fn format_failures(&self, failures: &[WorkerFailure]) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Include percentiles on per-consumer lines
    pub verbose_mode: bool,
    /// Digits after the decimal point for converted latencies
    pub precision: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            precision: 3,
        }
    }
}

pub(super) fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format report: {}", e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    /// A latency value with its unit suffix
    pub fn format_latency(&self, value: f64, unit: DisplayUnit) -> String {
        match unit {
            DisplayUnit::Ticks => format!("{:.0} {}", value, unit.suffix()),
            _ => format!("{:.*} {}", self.options.precision, value, unit.suffix()),
        }
    }

    /// `Min: .., Max: .., Average: ..` plus percentiles when asked for
    pub fn format_statistics(&self, stats: &DisplayStatistics, with_percentiles: bool) -> String {
        let unit = stats.unit;
        let mut text = format!(
            "Min: {}, Max: {}, Average: {}",
            self.format_latency(stats.min, unit),
            self.format_latency(stats.max, unit),
            self.format_latency(stats.average, unit)
        );
        if with_percentiles {
            text.push_str(&format!(
                ", P50: {}, P95: {}, P99: {}",
                self.format_latency(stats.p50, unit),
                self.format_latency(stats.p95, unit),
                self.format_latency(stats.p99, unit)
            ));
        }
        text
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        let ms = duration.as_secs_f64() * 1000.0;
        if ms < 1000.0 {
            format!("{:.1}ms", ms)
        } else if ms < 60000.0 {
            format!("{:.2}s", ms / 1000.0)
        } else {
            let minutes = (ms / 60000.0) as u32;
            let seconds = (ms % 60000.0) / 1000.0;
            format!("{}m{:.1}s", minutes, seconds)
        }
    }

    pub fn verbose(&self) -> bool {
        self.options.verbose_mode
    }

    pub fn consumer_line(&self, result: &ConsumerResult, stats: Option<&DisplayStatistics>) -> String {
        let mut line = format!(
            "ConnectionId: {}, Transport: {}, Count: {}",
            result.connection_id,
            result.transport_kind,
            result.count()
        );
        match stats {
            Some(stats) => {
                line.push_str(", ");
                line.push_str(&self.format_statistics(stats, self.options.verbose_mode));
            }
            None => line.push_str(" (no samples)"),
        }
        if result.rejected > 0 {
            line.push_str(&format!(", Rejected: {}", result.rejected));
        }
        line
    }

    pub fn consumer_total_line(&self, total: Option<&DisplayStatistics>, consumers: usize) -> String {
        match total {
            _ if consumers == 0 => "Consumers: no consumers".to_string(),
            None => format!("Consumers: {} workers, count = 0 (no samples)", consumers),
            Some(total) => format!(
                "Consumers: {} workers, Count: {}, {}",
                consumers,
                total.count,
                self.format_statistics(total, true)
            ),
        }
    }

    pub fn producer_total_line(&self, total: &ProducerStatistics) -> String {
        if total.workers == 0 {
            return "Producers: no producers".to_string();
        }
        let mut line = format!("Producers: {} workers, Count: {}", total.workers, total.count);
        if total.failed > 0 {
            line.push_str(&format!(", Failed: {}", total.failed));
        }
        line
    }
}

impl ReportFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(fmt_err)?;
        writeln!(output, "  {}  ", title).map_err(fmt_err)?;
        write!(output, "{}", border).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_summary(&self, summary: &ExecutionSummary, clock_frequency: u64) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Run Summary:").map_err(fmt_err)?;
        writeln!(output, "------------").map_err(fmt_err)?;
        writeln!(output, "Endpoint:      {} ({})", summary.endpoint, summary.transport).map_err(fmt_err)?;
        writeln!(
            output,
            "Workers:       {} producers, {} consumers",
            summary.producers_requested, summary.consumers_requested
        )
        .map_err(fmt_err)?;
        writeln!(
            output,
            "Load:          {} msg/s per producer, {} byte payload",
            summary.frequency, summary.payload_size
        )
        .map_err(fmt_err)?;
        if let Some(target) = summary.target_count {
            writeln!(output, "Target:        {} per producer", target).map_err(fmt_err)?;
        }
        writeln!(output, "Clock:         {} ticks/s", clock_frequency).map_err(fmt_err)?;
        writeln!(output, "Stopped:       {}", summary.stop_reason).map_err(fmt_err)?;
        write!(output, "Elapsed:       {}", self.format_duration(summary.elapsed)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_producer(&self, result: &ProducerResult) -> Result<String> {
        Ok(result.to_string())
    }

    fn format_producer_total(&self, total: &ProducerStatistics) -> Result<String> {
        Ok(self.producer_total_line(total))
    }

    fn format_consumer(&self, result: &ConsumerResult, stats: Option<&DisplayStatistics>) -> Result<String> {
        Ok(self.consumer_line(result, stats))
    }

    fn format_consumer_total(&self, total: Option<&DisplayStatistics>, consumers: usize) -> Result<String> {
        Ok(self.consumer_total_line(total, consumers))
    }

    fn format_failures(&self, failures: &[WorkerFailure]) -> Result<String> {
        let mut output = String::new();
        write!(output, "Worker failures ({}):", failures.len()).map_err(fmt_err)?;
        for failure in failures {
            write!(output, "\n  {}", failure).map_err(fmt_err)?;
        }
        Ok(output)
    }
}
