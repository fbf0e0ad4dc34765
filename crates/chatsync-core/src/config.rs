use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::constants;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for the fetch layer and the time-based selectors.
/// Every field is optional in the JSON form; missing ones take the defaults
/// from [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub messages_per_request: u32,
    pub request_long_timeout_ms: u64,
    pub backoff_first_ms: u64,
    pub backoff_ceiling_ms: u64,
    pub backoff_base: u32,
    pub presence_offline_threshold_secs: u64,
    pub typing_expiry_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            messages_per_request: constants::MESSAGES_PER_REQUEST,
            request_long_timeout_ms: constants::REQUEST_LONG_TIMEOUT_MS,
            backoff_first_ms: constants::BACKOFF_FIRST_MS,
            backoff_ceiling_ms: constants::BACKOFF_CEILING_MS,
            backoff_base: constants::BACKOFF_BASE,
            presence_offline_threshold_secs: constants::PRESENCE_OFFLINE_THRESHOLD_SECS,
            typing_expiry_ms: constants::TYPING_EXPIRY_MS,
        }
    }
}

impl CoreConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.messages_per_request < 2 {
            return Err(ConfigError::Invalid {
                field: "messages_per_request",
                reason: "must be at least 2".to_string(),
            });
        }
        if self.backoff_base < 2 {
            return Err(ConfigError::Invalid {
                field: "backoff_base",
                reason: "must be at least 2".to_string(),
            });
        }
        if self.backoff_first_ms == 0 || self.backoff_first_ms > self.backoff_ceiling_ms {
            return Err(ConfigError::Invalid {
                field: "backoff_first_ms",
                reason: "must be non-zero and not above backoff_ceiling_ms".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_long_timeout(&self) -> Duration {
        Duration::from_millis(self.request_long_timeout_ms)
    }

    /// Messages to ask for on each side of the anchor.
    pub fn half_page(&self) -> u32 {
        self.messages_per_request / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.messages_per_request, 100);
        assert_eq!(config.half_page(), 50);
        assert_eq!(config.request_long_timeout(), Duration::from_secs(60));
        assert_eq!(config.presence_offline_threshold_secs, 140);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = CoreConfig::from_json_str(r#"{"messages_per_request": 40}"#).unwrap();
        assert_eq!(config.half_page(), 20);
        assert_eq!(config.backoff_ceiling_ms, 10_000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = CoreConfig::from_json_str(r#"{"backoff_base": 1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "backoff_base", .. }));

        let err = CoreConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
