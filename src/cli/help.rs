//! Topic help shown with `--help-topic`
//!
//! Clap covers the flag reference; these topics explain the selectors and
//! environment variables clap cannot describe on one line.

use colored::*;

/// Topic help for the CLI application
pub struct HelpSystem;

impl HelpSystem {
    pub fn new() -> Self {
        Self
    }

    /// Names accepted by [`HelpSystem::display_topic_help`]
    pub fn topics() -> &'static [&'static str] {
        &["transport", "units", "env", "examples", "output"]
    }

    /// Help for a topic, `None` if the topic is unknown
    pub fn display_topic_help(&self, topic: &str, use_colors: bool) -> Option<String> {
        let (title, body) = match topic.to_lowercase().as_str() {
            "transport" | "transports" => ("TRANSPORT SELECTION", Self::transport_body()),
            "units" | "unit" => ("DISPLAY UNITS", Self::units_body()),
            "env" | "environment" => ("ENVIRONMENT VARIABLES", Self::env_body()),
            "examples" => ("EXAMPLES", Self::examples_body()),
            "output" => ("OUTPUT", Self::output_body()),
            _ => return None,
        };
        Some(format!("{}\n{}", self.section_header(title, use_colors), body))
    }

    /// Message for an unknown topic, listing the known ones
    pub fn unknown_topic(&self, topic: &str) -> String {
        format!(
            "Unknown help topic: '{}'\n\nAvailable topics: {}",
            topic,
            Self::topics().join(", ")
        )
    }

    fn section_header(&self, title: &str, use_colors: bool) -> String {
        if use_colors {
            title.bright_green().bold().to_string()
        } else {
            title.to_string()
        }
    }

    fn transport_body() -> String {
        [
            "  -t, --transport <SELECTOR>",
            "",
            "  auto                  let the hub offer; prefers sockets, then event streams, then long-poll",
            "  long-poll             repeated HTTP polls (alias: longpolling)",
            "  server-push-stream    server-sent events (aliases: sse, serversentevents)",
            "  full-duplex-socket    websocket (aliases: websocket, websockets, ws)",
            "",
            "  Selectors are case sensitive. Anything else is a configuration error and",
            "  the run does not start. With --endpoint local every selector uses the",
            "  in-process hub.",
        ]
        .join("\n")
    }

    fn units_body() -> String {
        [
            "  -d, --display-unit <UNIT>",
            "",
            "  ticks (t)             raw clock ticks",
            "  seconds (s)",
            "  milliseconds (ms, m)  default",
            "  microseconds (us)",
            "",
            "  Values are converted as ticks * scale / clock frequency.",
        ]
        .join("\n")
    }

    fn env_body() -> String {
        [
            "  Read from the process environment and from a .env file in the working",
            "  directory. Command-line flags win over both.",
            "",
            "  HUB_PRODUCERS, HUB_CONSUMERS, HUB_FREQUENCY, HUB_PAYLOAD_SIZE,",
            "  HUB_ENDPOINT, HUB_DISPLAY_UNIT, HUB_TRANSPORT, HUB_TARGET_COUNT,",
            "  HUB_DURATION_SECS, ENABLE_COLOR, LOG_LEVEL",
        ]
        .join("\n")
    }

    fn examples_body() -> String {
        [
            "  hlt --endpoint local -p 1 -c 1 -f 10 -n 5",
            "      five messages through the in-process hub, then report",
            "",
            "  hlt -e http://localhost:8123/hub -t ws -p 10 -c 50 --duration 60",
            "      one minute against a remote hub over sockets",
            "",
            "  hlt -e http://localhost:8123/hub -d us --json > run.json",
            "      run until Enter or Ctrl-C, write a JSON report",
        ]
        .join("\n")
    }

    fn output_body() -> String {
        [
            "  The report lists every producer, the producer total, every consumer and",
            "  the consumer total, followed by workers that failed to connect.",
            "",
            "  --json        machine-readable report on stdout; logs move to stderr",
            "  --no-color    plain text",
            "  --verbose     percentiles on every consumer line, info-level logs",
        ]
        .join("\n")
    }
}

impl Default for HelpSystem {
    fn default() -> Self {
        Self::new()
    }
}
