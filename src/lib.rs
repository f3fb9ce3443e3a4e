//! pagesnap: capture a live, dynamically-rendered web page as a single
//! self-contained HTML file.
//!
//! The pipeline renders the page in a real browser, discovers every
//! externally-referenced resource (including ones hidden behind dynamic
//! placeholder maps and ephemeral `blob:` references), fetches them with
//! credential fallback, and rewrites the document so all references are
//! inline. The result can be saved locally or pushed to a publishing
//! service.
//!
//! ```no_run
//! use pagesnap::{LogProgress, SnapshotConfigBuilder, snapshot_url};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = SnapshotConfigBuilder::new().build()?;
//! let doc = snapshot_url("https://example.com", &config, &LogProgress).await?;
//! tokio::fs::write("page.html", &doc.html).await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod progress;
pub mod publish;
pub mod snapshot;
pub mod utils;

pub use browser::{
    BrowserSession, CdpCapture, capture_page_html, download_managed_browser,
    find_browser_executable, snapshot_url,
};
pub use config::{SnapshotConfig, SnapshotConfigBuilder};
pub use progress::{LogProgress, NoOpProgress, SnapshotProgress, SnapshotStep};
pub use publish::{PublishClient, PublishError, PublishedPage};
pub use snapshot::{
    CollectedResources, EphemeralCapture, FetchedContent, GeneratedDocument, NoEphemeralCapture,
    ResourceKind, SnapshotError, SnapshotResult, collect_resources, fetch_resources, generate_html,
    snapshot_page,
};
pub use utils::filename_from_title;
