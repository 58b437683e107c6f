//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.estimation.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "estimation.top_n must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.estimation.threshold) {
            return Err(ConfigError::ValidationError(
                "estimation.threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.vocabulary.layout.total() == 0 {
            return Err(ConfigError::ValidationError(
                "vocabulary.layout must contain at least one tag".into(),
            ));
        }
        if self.vocabulary.layout.rating == 0 {
            return Err(ConfigError::ValidationError(
                "vocabulary.layout.rating must be > 0".into(),
            ));
        }
        self.output_format()?;
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}
