//! Configuration module for snapshot capture
//!
//! This module provides the `SnapshotConfig` struct and its builder for
//! configuring capture and publish operations with validation and
//! sensible defaults.

// Sub-modules
pub mod builder;
pub mod types;

// Re-exports for public API
pub use builder::{API_KEY_ENV, ENDPOINT_ENV, SnapshotConfigBuilder};
pub use types::SnapshotConfig;
