//! Command-line interface

pub mod help;

pub use help::HelpSystem;

use clap::Parser;

/// Hub Latency Tester - load generator and end-to-end latency meter for broadcast hubs
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "hlt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Number of producer workers [default: 5]
    #[arg(short, long)]
    pub producers: Option<usize>,

    /// Number of consumer workers [default: 5]
    #[arg(short, long)]
    pub consumers: Option<usize>,

    /// Messages per second sent by each producer [default: 100]
    #[arg(short, long)]
    pub frequency: Option<u32>,

    /// Message body size in bytes [default: 100]
    #[arg(short = 's', long = "size")]
    pub payload_size: Option<usize>,

    /// Hub endpoint URL, or `local` for the in-process hub [default: http://localhost:8123/hub]
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Latency display unit: ticks, seconds, milliseconds, microseconds [default: milliseconds]
    #[arg(short, long, value_name = "UNIT")]
    pub display_unit: Option<String>,

    /// Transport: auto, long-poll, server-push-stream, full-duplex-socket [default: auto]
    #[arg(short, long, value_name = "SELECTOR")]
    pub transport: Option<String>,

    /// Stop each producer after this many successful sends
    #[arg(short = 'n', long = "count", value_name = "COUNT")]
    pub target_count: Option<u64>,

    /// Stop the run after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_positive)]
    pub duration: Option<u64>,

    /// Grace period in milliseconds between target completion and stopping consumers [default: 500]
    #[arg(long, value_name = "MS")]
    pub drain_ms: Option<u64>,

    /// Upper bound for a single send, in seconds [default: 10]
    #[arg(long, value_name = "SECONDS", value_parser = parse_positive)]
    pub send_timeout: Option<u64>,

    /// Write the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format: console, json, compact
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Show help for a topic (transport, units, env, examples, output)
    #[arg(long, value_name = "TOPIC")]
    pub help_topic: Option<String>,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }
        Ok(())
    }

    pub fn should_show_topic_help(&self) -> bool {
        self.help_topic.is_some()
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Help text for the requested topic
    pub fn display_help(&self) -> String {
        let help_system = HelpSystem::new();
        let topic = self.help_topic.as_deref().unwrap_or("examples");
        help_system
            .display_topic_help(topic, self.use_colors())
            .unwrap_or_else(|| help_system.unknown_topic(topic))
    }
}

/// Parse a strictly positive integer
fn parse_positive(s: &str) -> Result<u64, String> {
    if s.starts_with('+') {
        return Err(format!("Invalid value: {}", s));
    }
    match s.parse::<u64>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("Invalid value: {}", s)),
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    cfg!(unix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_defaults() {
        let cli = Cli::parse_from(["hlt"]);
        assert!(cli.producers.is_none());
        assert!(cli.transport.is_none());
        assert!(cli.target_count.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_parsing_short_flags() {
        let cli = Cli::parse_from([
            "hlt", "-p", "1", "-c", "2", "-f", "10", "-s", "16", "-e", "local", "-d", "ms", "-t", "ws", "-n", "5",
        ]);
        assert_eq!(cli.producers, Some(1));
        assert_eq!(cli.consumers, Some(2));
        assert_eq!(cli.frequency, Some(10));
        assert_eq!(cli.payload_size, Some(16));
        assert_eq!(cli.endpoint.as_deref(), Some("local"));
        assert_eq!(cli.display_unit.as_deref(), Some("ms"));
        assert_eq!(cli.transport.as_deref(), Some("ws"));
        assert_eq!(cli.target_count, Some(5));
    }

    #[test]
    fn test_cli_parsing_long_flags() {
        let cli = Cli::parse_from([
            "hlt",
            "--duration",
            "30",
            "--drain-ms",
            "100",
            "--send-timeout",
            "2",
            "--json",
            "--no-color",
            "--verbose",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.duration, Some(30));
        assert_eq!(cli.drain_ms, Some(100));
        assert_eq!(cli.send_timeout, Some(2));
        assert!(cli.json);
        assert!(cli.no_color);
        assert!(cli.verbose);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("json"));
    }

    #[test]
    fn test_unknown_transport_is_accepted_by_clap() {
        // Selector validation belongs to the config layer
        let cli = Cli::parse_from(["hlt", "--transport", "carrier-pigeon"]);
        assert_eq!(cli.transport.as_deref(), Some("carrier-pigeon"));
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(Cli::try_parse_from(["hlt", "--duration", "0"]).is_err());
        assert!(Cli::try_parse_from(["hlt", "--send-timeout", "+3"]).is_err());
        assert!(parse_positive("abc").is_err());
        assert_eq!(parse_positive("7").unwrap(), 7);
    }

    #[test]
    fn test_color_flag_conflict() {
        let cli = Cli::parse_from(["hlt", "--color", "--no-color"]);
        assert!(cli.validate().unwrap_err().contains("--color and --no-color"));

        let cli = Cli::parse_from(["hlt", "--color"]);
        assert!(cli.validate().is_ok());
        assert!(cli.use_colors());

        let cli = Cli::parse_from(["hlt", "--no-color"]);
        assert!(!cli.use_colors());
    }

    #[test]
    fn test_help_topics() {
        let cli = Cli::parse_from(["hlt", "--help-topic", "units"]);
        assert!(cli.should_show_topic_help());
        assert!(cli.display_help().contains("microseconds"));

        let cli = Cli::parse_from(["hlt", "--help-topic", "nope"]);
        assert!(cli.display_help().contains("Unknown help topic"));
    }
}
