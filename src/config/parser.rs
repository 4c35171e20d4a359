//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    logging::{LogFormat, LogLevel},
    models::RunConfig,
    types::{DisplayUnit, TransportPreference},
};

/// Configuration parser that layers defaults, `.env`, environment and CLI
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<RunConfig> {
        self.cli.validate().map_err(AppError::config)?;

        let mut config = RunConfig::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config)?;

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut RunConfig) -> Result<()> {
        let cli = &self.cli;

        if let Some(producers) = cli.producers {
            config.producers = producers;
        }
        if let Some(consumers) = cli.consumers {
            config.consumers = consumers;
        }
        if let Some(frequency) = cli.frequency {
            config.frequency = frequency;
        }
        if let Some(size) = cli.payload_size {
            config.payload_size = size;
        }
        if let Some(ref endpoint) = cli.endpoint {
            config.endpoint = endpoint.trim().to_string();
        }
        if let Some(ref unit) = cli.display_unit {
            config.display_unit = unit.parse::<DisplayUnit>()?;
        }
        if let Some(ref transport) = cli.transport {
            config.transport = transport.parse::<TransportPreference>()?;
        }
        if cli.target_count.is_some() {
            config.target_count = cli.target_count;
        }
        if cli.duration.is_some() {
            config.duration_secs = cli.duration;
        }
        if let Some(drain_ms) = cli.drain_ms {
            config.drain_ms = drain_ms;
        }
        if let Some(send_timeout) = cli.send_timeout {
            config.send_timeout_secs = send_timeout;
        }
        if let Some(ref level) = cli.log_level {
            config.log_level = Some(level.parse::<LogLevel>()?);
        }
        if let Some(ref format) = cli.log_format {
            config.log_format = format.parse::<LogFormat>()?;
        }

        // --color forces, otherwise the terminal can still veto
        config.enable_color = cli.color || (config.enable_color && cli.use_colors());

        // CLI-only switches
        config.json_output = cli.json;
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<RunConfig> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &RunConfig) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Endpoint: {}", config.endpoint));
    summary.push(format!("Transport: {}", config.transport));
    summary.push(format!("Producers: {}", config.producers));
    summary.push(format!("Consumers: {}", config.consumers));
    summary.push(format!("Frequency: {} msg/s", config.frequency));
    summary.push(format!("Payload Size: {} bytes", config.payload_size));
    summary.push(format!("Display Unit: {}", config.display_unit));
    summary.push(format!(
        "Target Count: {}",
        config.target_count.map_or_else(|| "none".to_string(), |c| c.to_string())
    ));
    summary.push(format!(
        "Duration: {}",
        config.duration_secs.map_or_else(|| "until interrupted".to_string(), |s| format!("{}s", s))
    ));
    summary.push(format!("Drain: {}ms", config.drain_ms));
    summary.push(format!("Send Timeout: {}s", config.send_timeout_secs));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
