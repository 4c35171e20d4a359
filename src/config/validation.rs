//! Soft configuration checks
//!
//! Hard errors live in [`RunConfig::validate`]; the checks here only warn
//! about settings that will run but probably not the way the user expects.

use crate::{error::Result, models::RunConfig};
use colored::*;

/// Send rate above which the per-producer interval drops below a millisecond
pub const HIGH_FREQUENCY_THRESHOLD: u32 = 1000;

/// Worker population above which local scheduling noise shows up in latencies
pub const LARGE_POPULATION_THRESHOLD: usize = 1000;

/// Configuration validator producing non-fatal warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run the hard checks, then collect warnings
    pub fn validate_comprehensive(config: &RunConfig) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_load(config));
        warnings.extend(Self::validate_population(config));
        warnings.extend(Self::validate_stop_conditions(config));
        warnings.extend(Self::validate_transport(config));
        Ok(warnings)
    }

    fn validate_load(config: &RunConfig) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.frequency > HIGH_FREQUENCY_THRESHOLD {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Frequency of {} msg/s gives a sub-millisecond send interval; timer granularity may cap the real rate",
                    config.frequency
                ),
            ));
        }

        let offered = config.producers as u64 * u64::from(config.frequency);
        let deliveries = offered * config.consumers as u64;
        if deliveries > 1_000_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Configuration asks the hub for about {} deliveries per second ({} sends x {} consumers)",
                    deliveries, offered, config.consumers
                ),
            ));
        }

        warnings
    }

    fn validate_population(config: &RunConfig) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.consumers > 0 && config.producers == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Consumers without producers will receive nothing".to_string(),
            ));
        }

        if config.producers + config.consumers > LARGE_POPULATION_THRESHOLD {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "{} workers share this machine; local scheduling delay is included in every sample",
                    config.producers + config.consumers
                ),
            ));
        }

        warnings
    }

    fn validate_stop_conditions(config: &RunConfig) -> Vec<ValidationWarning> {
        if config.producers > 0 && config.target_count.is_none() && config.duration_secs.is_none() {
            vec![ValidationWarning::new(
                ValidationLevel::Info,
                "No --count or --duration given; the run ends on Enter or Ctrl-C".to_string(),
            )]
        } else {
            Vec::new()
        }
    }

    fn validate_transport(config: &RunConfig) -> Vec<ValidationWarning> {
        if config.is_local_endpoint() && config.transport.required_kind().is_some() {
            vec![ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Transport '{}' is ignored for the in-process hub",
                    config.transport
                ),
            )]
        } else {
            Vec::new()
        }
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Info => Color::Blue,
            Self::Warning => Color::Yellow,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()).bold(), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &RunConfig) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransportPreference;

    fn bounded() -> RunConfig {
        RunConfig {
            endpoint: "local".to_string(),
            target_count: Some(10),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_bounded_run_has_no_warnings() {
        let warnings = validate_config(&bounded()).unwrap();
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_hard_errors_propagate() {
        let config = RunConfig { frequency: 0, ..bounded() };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.category(), "CONFIG");
    }

    #[test]
    fn test_high_frequency_warning() {
        let config = RunConfig { frequency: 2000, ..bounded() };
        let warnings = validate_config(&config).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.level == ValidationLevel::Warning && w.message.contains("sub-millisecond")));
    }

    #[test]
    fn test_consumers_without_producers() {
        let config = RunConfig { producers: 0, consumers: 3, ..bounded() };
        let warnings = validate_config(&config).unwrap();
        assert!(warnings.iter().any(|w| w.message.contains("receive nothing")));
    }

    #[test]
    fn test_unbounded_run_is_noted() {
        let config = RunConfig { target_count: None, ..bounded() };
        let warnings = validate_config(&config).unwrap();
        assert!(warnings.iter().any(|w| w.message.contains("Ctrl-C")));

        let config = RunConfig { target_count: None, duration_secs: Some(5), ..bounded() };
        assert!(validate_config(&config).unwrap().is_empty());
    }

    #[test]
    fn test_explicit_transport_on_local_hub() {
        let config = RunConfig { transport: TransportPreference::LongPoll, ..bounded() };
        let warnings = validate_config(&config).unwrap();
        assert!(warnings.iter().any(|w| w.message.contains("'long-poll' is ignored")));
    }

    #[test]
    fn test_warning_format() {
        let warning = ValidationWarning::new(ValidationLevel::Info, "hello".to_string());
        assert_eq!(warning.format(false), "[INFO] hello");
    }
}
