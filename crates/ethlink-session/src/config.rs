use ethlink_frame::FrameConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::retry::RetryPolicy;

/// Default per-attempt receive timeout, in link timeout units.
pub const DEFAULT_TIMEOUT_UNITS: u32 = 100;

/// Default ceiling on the size a peer may announce for a variable transfer.
pub const DEFAULT_MAX_VARIABLE_SIZE: u32 = 64 * 1024 * 1024;

/// Configuration for a [`TransferSession`](crate::TransferSession).
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Timeout for each receive attempt inside a session.
    pub timeout_units: u32,
    /// What to do when a receive attempt fails.
    pub retry: RetryPolicy,
    /// Frame geometry. Both peers must agree on it.
    pub frame: FrameConfig,
    /// Largest size `recv_variable` accepts from the peer.
    pub max_variable_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_units: DEFAULT_TIMEOUT_UNITS,
            retry: RetryPolicy::default(),
            frame: FrameConfig::default(),
            max_variable_size: DEFAULT_MAX_VARIABLE_SIZE,
        }
    }
}

impl SessionConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_units == 0 {
            return Err(SessionError::Config(
                "timeout_units must be greater than zero".to_string(),
            ));
        }
        self.retry.validate()?;
        self.frame.validate()?;
        Ok(())
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the per-attempt timeout.
    pub fn with_timeout_units(mut self, timeout_units: u32) -> Self {
        self.timeout_units = timeout_units;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Backoff;

    #[test]
    fn empty_object_is_default() {
        let config = SessionConfig::from_json("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.timeout_units, 100);
        assert_eq!(config.max_variable_size, 64 * 1024 * 1024);
        assert_eq!(config.retry.max_attempts, None);
    }

    #[test]
    fn full_config_parses() {
        let config = SessionConfig::from_json(
            r#"{
                "timeout_units": 250,
                "retry": {"max_attempts": 8, "backoff": {"kind": "fixed", "delay_ms": 5}},
                "frame": {"max_chunk": 1024, "min_frame": 60},
                "max_variable_size": 4096
            }"#,
        )
        .unwrap();
        assert_eq!(config.timeout_units, 250);
        assert_eq!(config.retry.max_attempts, Some(8));
        assert_eq!(config.retry.backoff, Backoff::Fixed { delay_ms: 5 });
        assert_eq!(config.frame.max_chunk, 1024);
        assert_eq!(config.frame.min_frame, 60);
        assert_eq!(config.max_variable_size, 4096);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            SessionConfig::from_json(r#"{"timeout_units": 0}"#),
            Err(SessionError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{"retry": {"max_attempts": 0}}"#),
            Err(SessionError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{"frame": {"max_chunk": 10}}"#),
            Err(SessionError::Frame(_))
        ));
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(matches!(
            SessionConfig::from_json(r#"{"timeout": 5}"#),
            Err(SessionError::Json(_))
        ));
    }
}
