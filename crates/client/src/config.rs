//! Session configuration
//!
//! Every field has a default matching the clock firmware's expectations, so a
//! configuration file only needs the keys it changes:
//!
//! ```
//! use nixielink_client::SessionConfig;
//!
//! let config = SessionConfig::from_json(r#"{ "url": "ws://clock.local" }"#).unwrap();
//! assert_eq!(config.url, "ws://clock.local");
//! assert_eq!(config.max_retries, 10);
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Default device address when the panel is served by the clock's own AP
pub const DEFAULT_URL: &str = "ws://192.168.4.1/";

/// Timing and addressing of one session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// WebSocket endpoint of the clock
    pub url: String,

    /// Delay before an unanswered request is written again
    #[serde(rename = "resend_interval_ms", deserialize_with = "millis")]
    pub resend_interval: Duration,

    /// Resends allowed after the first write before the slot escalates
    pub max_retries: u32,

    /// Time a socket may stay half-open before it is force-closed
    #[serde(rename = "connect_timeout_ms", deserialize_with = "millis")]
    pub connect_timeout: Duration,

    /// Pause between a failed (re)connect and the next full restart
    #[serde(rename = "restart_backoff_ms", deserialize_with = "millis")]
    pub restart_backoff: Duration,

    /// Capacity of the command and socket channels
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            resend_interval: Duration::from_millis(500),
            max_retries: 10,
            connect_timeout: Duration::from_secs(2),
            restart_backoff: Duration::from_millis(500),
            channel_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Default configuration pointing at `url`
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "url must use ws:// or wss://, got {:?}",
                self.url
            )));
        }
        if self.resend_interval.is_zero() {
            return Err(ConfigError::Invalid("resend_interval_ms must be positive".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid("connect_timeout_ms must be positive".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be positive".into()));
        }
        Ok(())
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
