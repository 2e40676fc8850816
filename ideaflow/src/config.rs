//! Tracker configuration.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::TrackerError;
use crate::pipeline::ReconnectConfig;

fn default_api_base_url() -> String {
    "http://localhost:8000/api/".to_string()
}

fn default_request_timeout() -> f64 {
    15.0
}

/// Longest accepted request timeout, in seconds.
pub const MAX_REQUEST_TIMEOUT_SECONDS: f64 = 3600.0;

/// Configuration for a pipeline tracker and its HTTP collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base URL of the validation API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Timeout applied to each one-shot request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: f64,
    /// Stream reconnection settings.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_seconds: default_request_timeout(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Creates a configuration for the given API base URL.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Loads a configuration from JSON, filling in defaults.
    pub fn from_json(json: &str) -> Result<Self, TrackerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    /// Sets the reconnection settings.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Gets the request timeout as a Duration.
    ///
    /// Values that do not form a duration fall back to the default.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_timeout_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_request_timeout()))
    }

    /// Parses the API base URL.
    ///
    /// A trailing slash is added when missing so relative paths append to it.
    pub fn base_url(&self) -> Result<Url, TrackerError> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| TrackerError::Config(format!("api_base_url '{}': {e}", self.api_base_url)))?;
        if url.cannot_be_a_base() {
            return Err(TrackerError::Config(format!(
                "api_base_url '{}' cannot be used as a base",
                self.api_base_url
            )));
        }
        Ok(url)
    }

    /// Checks the configuration for values the tracker cannot work with.
    pub fn validate(&self) -> Result<(), TrackerError> {
        self.base_url()?;
        let timeout = self.request_timeout_seconds;
        if !timeout.is_finite() || timeout <= 0.0 || timeout > MAX_REQUEST_TIMEOUT_SECONDS {
            return Err(TrackerError::Config(format!(
                "request_timeout_seconds must be in (0, {MAX_REQUEST_TIMEOUT_SECONDS}], got {timeout}"
            )));
        }
        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            return Err(TrackerError::Config(
                "reconnect.max_delay_ms must not be below reconnect.base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}
