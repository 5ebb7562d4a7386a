//! Scoreboard configuration.
//!
//! # Responsibility
//! - Hold the collection name, fine rates and reset-dialog timing.
//! - Load overrides from JSON with every field optional.
//!
//! # Invariants
//! - A validated config has a non-empty collection and non-zero rates.

use crate::model::fines::{FineRates, DEFAULT_MAJOR_RATE, DEFAULT_MINOR_RATE};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_COLLECTION: &str = "usuarios";
pub const DEFAULT_PLACEHOLDER_PHOTO: &str = "/placeholder.svg";
pub const DEFAULT_DISMISS_AFTER_MS: u64 = 2_000;
pub const DEFAULT_RESET_MESSAGE: &str = "Todas las multas fueron reiniciadas";

/// Configuration load/validation error.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Runtime settings for one scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoreboardConfig {
    /// Record store collection holding one document per person.
    pub collection: String,
    /// Photo reference used when a document has none.
    pub placeholder_photo: String,
    pub minor_rate: u64,
    pub major_rate: u64,
    /// How long the reset confirmation stays visible after success.
    pub dismiss_after_ms: u64,
    /// Transient message shown after a successful reset.
    pub reset_message: String,
}

impl Default for ScoreboardConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            placeholder_photo: DEFAULT_PLACEHOLDER_PHOTO.to_string(),
            minor_rate: DEFAULT_MINOR_RATE,
            major_rate: DEFAULT_MAJOR_RATE,
            dismiss_after_ms: DEFAULT_DISMISS_AFTER_MS,
            reset_message: DEFAULT_RESET_MESSAGE.to_string(),
        }
    }
}

impl ScoreboardConfig {
    /// Parses and validates a JSON config document.
    ///
    /// Missing fields keep their defaults; unknown fields are rejected.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("collection cannot be empty".to_string()));
        }
        if self.minor_rate == 0 || self.major_rate == 0 {
            return Err(ConfigError::Invalid(format!(
                "fine rates must be positive, got minor={} major={}",
                self.minor_rate, self.major_rate
            )));
        }
        Ok(())
    }

    pub fn rates(&self) -> FineRates {
        FineRates {
            minor: self.minor_rate,
            major: self.major_rate,
        }
    }

    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.dismiss_after_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ScoreboardConfig, DEFAULT_COLLECTION};
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ScoreboardConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ScoreboardConfig::default());
        assert_eq!(config.collection, DEFAULT_COLLECTION);
        assert_eq!(config.rates().minor, 200);
        assert_eq!(config.rates().major, 500);
        assert_eq!(config.dismiss_after(), Duration::from_secs(2));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            ScoreboardConfig::from_json_str(r#"{"collection":"oficina","major_rate":1000}"#)
                .unwrap();
        assert_eq!(config.collection, "oficina");
        assert_eq!(config.major_rate, 1000);
        assert_eq!(config.minor_rate, 200);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ScoreboardConfig::from_json_str(r#"{"collection":"  "}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ScoreboardConfig::from_json_str(r#"{"minor_rate":0}"#).unwrap_err();
        assert!(err.to_string().contains("positive"));

        let err = ScoreboardConfig::from_json_str(r#"{"colection":"typo"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multas.json");
        std::fs::write(&path, r#"{"dismiss_after_ms":500}"#).unwrap();

        let config = ScoreboardConfig::load(&path).unwrap();
        assert_eq!(config.dismiss_after(), Duration::from_millis(500));

        let missing = ScoreboardConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
