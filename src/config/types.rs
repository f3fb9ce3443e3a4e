//! Core configuration types for snapshot capture and publishing
//!
//! This module contains the main `SnapshotConfig` struct that defines the
//! configuration parameters for snapshot operations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_FETCH_TIMEOUT_SECS, PUBLISH_MAX_POLLS, PUBLISH_POLL_INTERVAL,
};

/// Main configuration struct for snapshot operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Per-request timeout in seconds for resource fetches.
    ///
    /// This is the only time bound on a fetch batch; there is no
    /// per-batch cap on concurrent requests.
    pub(crate) fetch_timeout_secs: u64,

    /// Cookie header attached by the credentialed fetch strategy.
    ///
    /// Stands in for the browser's ambient credentials: resources behind
    /// authentication need it, while cross-origin wildcard responses
    /// reject it, which is why the anonymous retry exists.
    pub(crate) cookie_header: Option<String>,

    /// Maximum size in bytes for inlining images as base64.
    /// Images larger than this are kept as external references.
    /// Default is None (all images are inlined).
    pub(crate) max_inline_image_size_bytes: Option<usize>,

    /// Run the capture browser headless
    pub(crate) headless: bool,

    /// Base URL of the publishing service API
    pub(crate) publish_endpoint: Option<String>,

    /// API key for the publishing service
    pub(crate) publish_api_key: Option<String>,

    /// Interval between publish status polls (overridable in tests)
    #[serde(skip, default = "default_poll_interval")]
    pub(crate) publish_poll_interval: Duration,

    /// Maximum number of publish status polls before giving up
    pub(crate) publish_max_polls: u32,
}

fn default_poll_interval() -> Duration {
    PUBLISH_POLL_INTERVAL
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            cookie_header: None,
            max_inline_image_size_bytes: None,
            headless: true,
            publish_endpoint: None,
            publish_api_key: None,
            publish_poll_interval: PUBLISH_POLL_INTERVAL,
            publish_max_polls: PUBLISH_MAX_POLLS,
        }
    }
}

impl SnapshotConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cookie_header(&self) -> Option<&str> {
        self.cookie_header.as_deref()
    }

    pub fn max_inline_image_size_bytes(&self) -> Option<usize> {
        self.max_inline_image_size_bytes
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn publish_endpoint(&self) -> Option<&str> {
        self.publish_endpoint.as_deref()
    }

    pub fn publish_api_key(&self) -> Option<&str> {
        self.publish_api_key.as_deref()
    }

    pub fn publish_poll_interval(&self) -> Duration {
        self.publish_poll_interval
    }

    pub fn publish_max_polls(&self) -> u32 {
        self.publish_max_polls
    }
}
