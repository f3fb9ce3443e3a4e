//! Core types for the snapshot pipeline
//!
//! This module contains the data structures exchanged between the
//! collector, fetcher, and assembler stages, plus the error types used
//! at the stage boundary.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Kind of external resource, which determines how content is fetched
/// and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Binary resource encoded as a base64 data URL
    Image,
    /// Stylesheet text, rewritten so nested url() references are inlined
    Css,
    /// Script text returned verbatim
    Script,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Css => write!(f, "css"),
            Self::Script => write!(f, "script"),
        }
    }
}

/// Mapping from resolved resource URL to fetched content for one kind.
///
/// Keys are always absolute URLs; the collector alone performs that
/// normalization. A failed fetch leaves its URL absent, and the assembler
/// leaves the original reference untouched when no entry exists.
pub type ResourceContentMap = HashMap<String, String>;

/// Everything the collector discovers in one synchronous pass over the
/// document, plus the eagerly captured ephemeral references.
#[derive(Debug, Clone, Default)]
pub struct CollectedResources {
    /// Absolute image URLs (plain sources, srcset entries, favicons,
    /// css url() references in style attributes and style blocks)
    pub image_urls: HashSet<String>,
    /// Absolute external stylesheet URLs
    pub css_urls: HashSet<String>,
    /// Absolute external script URLs
    pub script_urls: HashSet<String>,
    /// Generation key → resolved URL map extracted from injected scripts.
    /// The page substitutes these lazily; the assembler must know them so
    /// the substitution survives in static form.
    pub placeholder_map: HashMap<String, String>,
    /// blob: URL → data URL, captured during discovery. These handles are
    /// session-scoped: anything missed here is permanently lost for this
    /// snapshot.
    pub ephemeral_map: HashMap<String, String>,
    /// Page title ("" when the document has none)
    pub title: String,
}

impl CollectedResources {
    /// Total number of fetchable URLs across all kinds
    #[must_use]
    pub fn total_urls(&self) -> usize {
        self.image_urls.len() + self.css_urls.len() + self.script_urls.len()
    }
}

/// Error information for a single failed resource
///
/// Per-resource failures are expected and non-fatal; the resource is
/// simply omitted from the content map.
#[derive(Debug, Clone)]
pub struct ResourceError {
    pub url: String,
    pub kind: ResourceKind,
    pub error: String,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.url, self.error)
    }
}

/// Stage-level error for snapshot operations
///
/// Reported as a structured value, never a panic across the component
/// boundary.
#[derive(Debug, Clone)]
pub enum SnapshotError {
    /// Configuration error
    ConfigError(String),
    /// Browser/capture error
    BrowserError(String),
    /// Document discovery failed
    CollectError(String),
    /// Document assembly failed
    AssembleError(String),
    /// Other errors
    Other(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            Self::BrowserError(msg) => write!(f, "Browser error: {msg}"),
            Self::CollectError(msg) => write!(f, "Resource collection failed: {msg}"),
            Self::AssembleError(msg) => write!(f, "Document assembly failed: {msg}"),
            Self::Other(msg) => write!(f, "Snapshot error: {msg}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<anyhow::Error> for SnapshotError {
    fn from(err: anyhow::Error) -> Self {
        // Use {:#} to preserve full error chain with context
        Self::Other(format!("{err:#}"))
    }
}

/// Convenience alias for Result with `SnapshotError`
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Final output of the assembler
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    /// Self-contained markup, doctype included
    pub html: String,
    /// Page title carried through from discovery
    pub title: String,
}

/// Content maps for all three kinds, as consumed by the assembler
#[derive(Debug, Clone, Default)]
pub struct FetchedContent {
    pub images: ResourceContentMap,
    pub css: ResourceContentMap,
    pub scripts: ResourceContentMap,
}
