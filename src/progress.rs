//! Progress reporting abstraction for snapshot operations
//!
//! Defines the `SnapshotProgress` trait for lifecycle event reporting
//! and provides no-op and log-backed implementations.

/// Pipeline step a progress message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStep {
    /// Scanning the document for resource references
    Collecting,
    /// Downloading discovered resources
    Fetching,
    /// Rewriting the document clone
    Assembling,
    /// Uploading the archive to the publishing service
    Publishing,
}

impl std::fmt::Display for SnapshotStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collecting => write!(f, "collect"),
            Self::Fetching => write!(f, "fetch"),
            Self::Assembling => write!(f, "assemble"),
            Self::Publishing => write!(f, "publish"),
        }
    }
}

/// Trait for reporting snapshot progress at key lifecycle events
///
/// Implementations can send updates to channels, log to console, update UI,
/// etc. The core pipeline takes this as an injected collaborator and never
/// reaches into ambient global state.
pub trait SnapshotProgress: Send + Sync {
    /// Report a step-scoped status message
    fn report(&self, step: SnapshotStep, message: &str);

    /// Dismiss any visible progress indication
    fn clear(&self);
}

/// Progress reporter that does nothing
///
/// Used by callers that don't need progress updates. All methods are
/// no-ops and will be inlined away by the compiler.
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl SnapshotProgress for NoOpProgress {
    #[inline(always)]
    fn report(&self, _step: SnapshotStep, _message: &str) {}

    #[inline(always)]
    fn clear(&self) {}
}

/// Progress reporter that forwards messages to the `log` facade
#[derive(Debug, Clone, Copy)]
pub struct LogProgress;

impl SnapshotProgress for LogProgress {
    fn report(&self, step: SnapshotStep, message: &str) {
        log::info!("[{step}] {message}");
    }

    fn clear(&self) {}
}
