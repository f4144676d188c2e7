use std::time::Duration;

use super::error::{BridgeError, BridgeResult};

/// Runtime configuration describing how to reach the persistence collaborator.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl BridgeConfig {
    /// Construct a configuration from an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Build a configuration by reading `PERSISTENCE_BASE_URL`.
    pub fn from_env() -> BridgeResult<Self> {
        let base_url = std::env::var("PERSISTENCE_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(BridgeError::MissingEnvVar {
                var: "PERSISTENCE_BASE_URL",
            })?;

        let mut config = Self::new(base_url);
        if let Some(secs) = std::env::var("PERSISTENCE_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
        {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}
