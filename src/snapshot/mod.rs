//! Snapshot pipeline: discovery, fetching, and assembly
//!
//! Converts captured page markup into a single self-contained HTML
//! document. The pipeline has three stages with a strict data flow:
//!
//! 1. [`collect_resources`] scans the markup and produces the absolute
//!    URL inventory (capturing ephemeral `blob:` references eagerly).
//! 2. [`fetch_resources`] downloads each kind concurrently and encodes
//!    content for inlining; stylesheets get their nested url() references
//!    rewritten on the way through.
//! 3. [`generate_html`] rewrites an owned clone of the markup so every
//!    resolved reference points at inline content, then serializes it.
//!
//! [`snapshot_page`] runs all three against already-captured markup;
//! the browser module drives a live page through the same pipeline.

pub mod assembler;
pub mod collector;
pub mod css_rewriter;
pub mod ephemeral;
pub mod fetcher;
pub mod types;

pub use assembler::generate_html;
pub use collector::collect_resources;
pub use ephemeral::{CaptureFuture, EphemeralCapture, NoEphemeralCapture};
pub use fetcher::{FetchStrategy, fetch_plan, fetch_resources};
pub use types::{
    CollectedResources, FetchedContent, GeneratedDocument, ResourceContentMap, ResourceError,
    ResourceKind, SnapshotError, SnapshotResult,
};

use crate::config::SnapshotConfig;
use crate::progress::SnapshotProgress;

/// Run the full pipeline over captured markup.
///
/// `base_url` must be the URL the markup was captured from; every
/// relative reference is resolved against it. Per-resource failures are
/// logged and leave the original reference in the output; only an
/// invalid base URL, a client build failure, or a serialization problem
/// fail the whole operation.
pub async fn snapshot_page(
    html: &str,
    base_url: &str,
    config: &SnapshotConfig,
    capture: &dyn EphemeralCapture,
    progress: &dyn SnapshotProgress,
) -> SnapshotResult<GeneratedDocument> {
    let is_local_file = base_url.starts_with("file:");

    let collected = collect_resources(html, base_url, is_local_file, capture, progress).await?;

    let client = fetcher::build_client(config).map_err(SnapshotError::from)?;

    // The three kinds are independent; download them in parallel.
    let (images, css, scripts) = futures::join!(
        fetch_resources(&client, &collected.image_urls, ResourceKind::Image, config, progress),
        fetch_resources(&client, &collected.css_urls, ResourceKind::Css, config, progress),
        fetch_resources(&client, &collected.script_urls, ResourceKind::Script, config, progress),
    );
    let content = FetchedContent { images, css, scripts };

    let document = generate_html(
        html,
        base_url,
        &content,
        &collected.placeholder_map,
        &collected.ephemeral_map,
        progress,
    )?;

    progress.clear();
    Ok(document)
}
