//! Colored formatter implementation with terminal color support

use super::formatter::{fmt_err, FormattingOptions, PlainFormatter, ReportFormatter};
use crate::{
    error::Result,
    executor::ExecutionSummary,
    models::{ConsumerResult, ProducerResult, WorkerFailure},
    stats::{DisplayStatistics, ProducerStatistics},
    types::DisplayUnit,
};
use colored::*;
use std::fmt::Write as _;

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyLevel {
    Excellent, // < 5ms
    Good,      // 5-50ms
    Fair,      // 50-250ms
    Poor,      // >= 250ms
}

impl LatencyLevel {
    /// Classify a value; raw ticks carry no wall-clock meaning and are not classified
    pub fn classify(value: f64, unit: DisplayUnit) -> Option<Self> {
        let ms = match unit {
            DisplayUnit::Ticks => return None,
            DisplayUnit::Seconds => value * 1e3,
            DisplayUnit::Milliseconds => value,
            DisplayUnit::Microseconds => value / 1e3,
        };

        Some(if ms < 5.0 {
            Self::Excellent
        } else if ms < 50.0 {
            Self::Good
        } else if ms < 250.0 {
            Self::Fair
        } else {
            Self::Poor
        })
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        let plain_formatter = PlainFormatter::new(options.clone());
        Self {
            plain_formatter,
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn latency(&self, value: f64, unit: DisplayUnit) -> ColoredString {
        let text = self.plain_formatter.format_latency(value, unit);
        match LatencyLevel::classify(value, unit) {
            Some(level) => self.colorize(&text, level.color()),
            None => self.colorize(&text, self.color_scheme.info),
        }
    }

    fn statistics(&self, stats: &DisplayStatistics, with_percentiles: bool) -> String {
        let unit = stats.unit;
        let mut text = format!(
            "Min: {}, Max: {}, Average: {}",
            self.latency(stats.min, unit),
            self.latency(stats.max, unit),
            self.latency(stats.average, unit)
        );
        if with_percentiles {
            text.push_str(&format!(
                ", P50: {}, P95: {}, P99: {}",
                self.latency(stats.p50, unit),
                self.latency(stats.p95, unit),
                self.latency(stats.p99, unit)
            ));
        }
        text
    }

    /// Check if terminal supports colors
    pub fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() && std::env::var("TERM").map(|term| term != "dumb").unwrap_or(true)
    }

    /// Enable or disable colors at runtime
    pub fn set_colors_enabled(&mut self, enabled: bool) {
        self.options.enable_color = enabled && Self::supports_color();
    }
}

impl ReportFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "═".repeat(title.chars().count() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err)?;
        writeln!(output, "  {}  ", self.bold(title).color(self.color_scheme.header)).map_err(fmt_err)?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.border)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_summary(&self, summary: &ExecutionSummary, clock_frequency: u64) -> Result<String> {
        let plain = self.plain_formatter.format_summary(summary, clock_frequency)?;
        let mut output = String::new();
        for (i, line) in plain.lines().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            match line.split_once(':') {
                Some((label, value)) if i > 1 => {
                    write!(output, "{}:{}", self.colorize(label, self.color_scheme.muted), value).map_err(fmt_err)?
                }
                _ => write!(output, "{}", self.bold(line)).map_err(fmt_err)?,
            }
        }
        Ok(output)
    }

    fn format_producer(&self, result: &ProducerResult) -> Result<String> {
        let mut line = format!(
            "ConnectionId: {}, Transport: {}, Count: {}",
            self.colorize(&result.connection_id, self.color_scheme.muted),
            result.transport_kind,
            self.bold(&result.sent.to_string())
        );
        if result.failed > 0 {
            line.push_str(&format!(
                ", Failed: {}",
                self.colorize(&result.failed.to_string(), self.color_scheme.warning)
            ));
        }
        Ok(line)
    }

    fn format_producer_total(&self, total: &ProducerStatistics) -> Result<String> {
        let line = self.plain_formatter.producer_total_line(total);
        let color = if total.failed > 0 { self.color_scheme.warning } else { self.color_scheme.success };
        Ok(self.colorize(&line, color).to_string())
    }

    fn format_consumer(&self, result: &ConsumerResult, stats: Option<&DisplayStatistics>) -> Result<String> {
        let mut line = format!(
            "ConnectionId: {}, Transport: {}, Count: {}",
            self.colorize(&result.connection_id, self.color_scheme.muted),
            result.transport_kind,
            self.bold(&result.count().to_string())
        );
        match stats {
            Some(stats) => {
                line.push_str(", ");
                line.push_str(&self.statistics(stats, self.plain_formatter.verbose()));
            }
            None => line.push_str(&format!(" {}", self.colorize("(no samples)", self.color_scheme.warning))),
        }
        if result.rejected > 0 {
            line.push_str(&format!(
                ", Rejected: {}",
                self.colorize(&result.rejected.to_string(), self.color_scheme.warning)
            ));
        }
        Ok(line)
    }

    fn format_consumer_total(&self, total: Option<&DisplayStatistics>, consumers: usize) -> Result<String> {
        match total {
            Some(total) if consumers > 0 => Ok(format!(
                "{} {}",
                self.colorize(&format!("Consumers: {} workers, Count: {},", consumers, total.count), self.color_scheme.success),
                self.statistics(total, true)
            )),
            _ => Ok(self
                .colorize(&self.plain_formatter.consumer_total_line(total, consumers), self.color_scheme.warning)
                .to_string()),
        }
    }

    fn format_failures(&self, failures: &[WorkerFailure]) -> Result<String> {
        let mut output = String::new();
        write!(
            output,
            "{}",
            self.colorize(&format!("Worker failures ({}):", failures.len()), self.color_scheme.error)
        )
        .map_err(fmt_err)?;
        for failure in failures {
            write!(output, "\n  {}", self.colorize(&failure.to_string(), self.color_scheme.error)).map_err(fmt_err)?;
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::LatencyStatistics;
    use crate::types::TransportKind;

    fn uncolored() -> ColoredFormatter {
        ColoredFormatter::new(FormattingOptions {
            enable_color: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_latency_levels() {
        assert_eq!(LatencyLevel::classify(1.0, DisplayUnit::Milliseconds), Some(LatencyLevel::Excellent));
        assert_eq!(LatencyLevel::classify(0.1, DisplayUnit::Seconds), Some(LatencyLevel::Fair));
        assert_eq!(LatencyLevel::classify(900.0, DisplayUnit::Microseconds), Some(LatencyLevel::Excellent));
        assert_eq!(LatencyLevel::classify(12.0, DisplayUnit::Ticks), None);
    }

    #[test]
    fn test_uncolored_lines_match_plain_text() {
        colored::control::set_override(false);
        let result = ConsumerResult {
            index: 0,
            connection_id: "c-9".to_string(),
            transport_kind: TransportKind::ServerSentEvents,
            samples: vec![2_000],
            rejected: 1,
        };
        let stats = LatencyStatistics::from_samples(&result.samples)
            .unwrap()
            .in_unit(DisplayUnit::Microseconds, 1_000_000_000);

        let line = uncolored().format_consumer(&result, Some(&stats)).unwrap();
        assert_eq!(
            line,
            "ConnectionId: c-9, Transport: ServerSentEvents, Count: 1, Min: 2.000 us, Max: 2.000 us, Average: 2.000 us, Rejected: 1"
        );
    }

    #[test]
    fn test_consumer_total_states_no_consumers() {
        colored::control::set_override(false);
        assert_eq!(uncolored().format_consumer_total(None, 0).unwrap(), "Consumers: no consumers");
    }
}
