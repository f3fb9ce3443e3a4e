//! Capture of ephemeral (session-scoped) object references
//!
//! `blob:` image sources are transient in-memory handles that become
//! unresolvable the moment the page session ends. They must be converted
//! to durable data URLs *during discovery* — the assembler only
//! substitutes what was captured here and never tries to resolve an
//! ephemeral reference lazily.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

/// Boxed future returned by capture methods
pub type CaptureFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Collaborator able to materialize an ephemeral reference into a data URL.
///
/// Implementations live where the page session lives (the privileged
/// browser context). Two methods are tried in order:
///
/// 1. `capture_pixels` — export the already-decoded pixel buffer through
///    an in-memory canvas. Fast, but cross-origin-tainted buffers throw.
/// 2. `refetch` — fetch the ephemeral reference directly inside the page
///    session and encode the retrieved bytes.
pub trait EphemeralCapture: Send + Sync {
    /// Export the decoded pixel buffer of the image at `url` as a data URL
    fn capture_pixels(&self, url: &str) -> CaptureFuture<'_>;

    /// Re-fetch the ephemeral reference and encode its bytes as a data URL
    fn refetch(&self, url: &str) -> CaptureFuture<'_>;
}

/// Capture implementation for callers without a live page session.
///
/// Both methods fail, so every ephemeral image is dropped from the map
/// and left as-is in the snapshot (it will render broken).
#[derive(Debug, Clone, Copy)]
pub struct NoEphemeralCapture;

impl EphemeralCapture for NoEphemeralCapture {
    fn capture_pixels(&self, url: &str) -> CaptureFuture<'_> {
        let url = url.to_string();
        Box::pin(async move {
            Err(anyhow::anyhow!(
                "no page session available to capture {url}"
            ))
        })
    }

    fn refetch(&self, url: &str) -> CaptureFuture<'_> {
        let url = url.to_string();
        Box::pin(async move {
            Err(anyhow::anyhow!("no page session available to fetch {url}"))
        })
    }
}

/// Try both capture methods in order, returning None on total failure.
///
/// The pixel-buffer export is attempted before the direct re-fetch; a
/// tainted canvas falls through to the network path.
pub async fn capture_ephemeral(capture: &dyn EphemeralCapture, url: &str) -> Option<String> {
    match capture.capture_pixels(url).await {
        Ok(data_url) => return Some(data_url),
        Err(e) => {
            log::debug!("Pixel export failed for {url} (possibly tainted): {e:#}");
        }
    }

    match capture.refetch(url).await {
        Ok(data_url) => Some(data_url),
        Err(e) => {
            log::warn!("Ephemeral capture failed for {url}, image will render broken: {e:#}");
            None
        }
    }
}
