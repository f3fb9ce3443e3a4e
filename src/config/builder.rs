//! Fluent builder for `SnapshotConfig` with validation and env fallback

use anyhow::{Result, anyhow};
use std::time::Duration;

use super::types::SnapshotConfig;

/// Environment variable holding the publishing service base URL
pub const ENDPOINT_ENV: &str = "PAGESNAP_ENDPOINT";

/// Environment variable holding the publishing service API key
pub const API_KEY_ENV: &str = "PAGESNAP_API_KEY";

#[derive(Debug, Clone, Default)]
pub struct SnapshotConfigBuilder {
    config: SnapshotConfig,
}

impl SnapshotConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn cookie_header(mut self, header: impl Into<String>) -> Self {
        self.config.cookie_header = Some(header.into());
        self
    }

    #[must_use]
    pub fn max_inline_image_size_bytes(mut self, bytes: usize) -> Self {
        self.config.max_inline_image_size_bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn publish_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.publish_endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn publish_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.publish_api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn publish_poll_interval(mut self, interval: Duration) -> Self {
        self.config.publish_poll_interval = interval;
        self
    }

    #[must_use]
    pub fn publish_max_polls(mut self, max: u32) -> Self {
        self.config.publish_max_polls = max;
        self
    }

    /// Fill publish settings from the environment when not set explicitly.
    #[must_use]
    pub fn publish_from_env(mut self) -> Self {
        if self.config.publish_endpoint.is_none()
            && let Ok(endpoint) = std::env::var(ENDPOINT_ENV)
            && !endpoint.trim().is_empty()
        {
            self.config.publish_endpoint = Some(endpoint);
        }
        if self.config.publish_api_key.is_none()
            && let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.config.publish_api_key = Some(key);
        }
        self
    }

    pub fn build(self) -> Result<SnapshotConfig> {
        if self.config.fetch_timeout_secs == 0 {
            return Err(anyhow!("fetch_timeout_secs must be non-zero"));
        }
        if self.config.publish_max_polls == 0 {
            return Err(anyhow!("publish_max_polls must be non-zero"));
        }
        if let Some(endpoint) = &self.config.publish_endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| anyhow!("Invalid publish endpoint '{endpoint}': {e}"))?;
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_cleanly() {
        let config = SnapshotConfigBuilder::new().build().unwrap();
        assert_eq!(config.fetch_timeout().as_secs(), 30);
        assert_eq!(config.publish_max_polls(), 40);
        assert!(config.headless());
        assert!(config.publish_endpoint().is_none());
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let err = SnapshotConfigBuilder::new()
            .publish_endpoint("not a url")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Invalid publish endpoint"));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(
            SnapshotConfigBuilder::new()
                .fetch_timeout_secs(0)
                .build()
                .is_err()
        );
    }
}
