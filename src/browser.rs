//! Browser session management and live-page capture
//!
//! Drives a real Chromium instance over CDP so the pipeline sees the
//! rendered document (dynamic content included), not the server's
//! initial markup. Also hosts the privileged side of ephemeral capture:
//! `blob:` URLs can only be resolved by JavaScript running inside the
//! page session that owns them.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use tokio::task::{self, JoinHandle};

use crate::config::SnapshotConfig;
use crate::progress::SnapshotProgress;
use crate::snapshot::ephemeral::{CaptureFuture, EphemeralCapture};
use crate::snapshot::{GeneratedDocument, SnapshotError, SnapshotResult, snapshot_page};
use crate::utils::constants::{CHROME_USER_AGENT, PAGE_SETTLE_DELAY_MS};

/// Find a Chrome/Chromium executable on the system.
pub async fn find_browser_executable() -> Result<PathBuf> {
    // Environment variable overrides all search paths
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            log::info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        log::warn!(
            "CHROMIUM_PATH points to non-existent file: {}",
            path.display()
        );
    }

    let paths = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for path_str in paths {
        let path = PathBuf::from(path_str);
        if path.exists() {
            log::info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    return Ok(PathBuf::from(path_str));
                }
            }
        }
    }

    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium when none is installed.
pub async fn download_managed_browser() -> Result<PathBuf> {
    log::info!("No local browser found, downloading managed Chromium");

    let cache_dir = std::env::temp_dir().join("pagesnap_chromium");
    std::fs::create_dir_all(&cache_dir).context("Failed to create browser cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let revision_info = fetcher.fetch().await.context("Failed to fetch browser")?;

    log::info!(
        "Downloaded Chromium to: {}",
        revision_info.folder_path.display()
    );
    Ok(revision_info.executable_path)
}

/// A running browser plus the handler task pumping its CDP event loop.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch Chromium, finding or downloading an executable as needed.
    pub async fn launch(config: &SnapshotConfig) -> SnapshotResult<Self> {
        launch_inner(config)
            .await
            .map_err(|e| SnapshotError::BrowserError(format!("{e:#}")))
    }

    /// Navigate to `url`, wait for the load to finish plus a short settle
    /// delay, and return the page handle.
    pub async fn open(&self, url: &str) -> SnapshotResult<Page> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| SnapshotError::BrowserError(format!("failed to open {url}: {e}")))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| SnapshotError::BrowserError(format!("navigation to {url} failed: {e}")))?;

        // Give dynamic content a moment to render after the load event
        tokio::time::sleep(Duration::from_millis(PAGE_SETTLE_DELAY_MS)).await;
        Ok(page)
    }

    /// Close the browser and wait for the event loop to drain.
    pub async fn close(mut self) -> SnapshotResult<()> {
        self.browser
            .close()
            .await
            .map_err(|e| SnapshotError::BrowserError(format!("failed to close browser: {e}")))?;
        let _ = self.handler_task.await;
        Ok(())
    }
}

async fn launch_inner(config: &SnapshotConfig) -> Result<BrowserSession> {
    let chrome_path = match find_browser_executable().await {
        Ok(path) => path,
        Err(_) => download_managed_browser().await?,
    };

    let user_data_dir =
        std::env::temp_dir().join(format!("pagesnap_chrome_{}", std::process::id()));
    std::fs::create_dir_all(&user_data_dir).context("Failed to create user data directory")?;

    let mut config_builder = BrowserConfigBuilder::default()
        .request_timeout(config.fetch_timeout())
        .window_size(1920, 1080)
        .user_data_dir(user_data_dir)
        .chrome_executable(chrome_path)
        .arg(format!("--user-agent={CHROME_USER_AGENT}"))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-notifications")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--no-sandbox")
        .arg("--disable-background-networking")
        .arg("--mute-audio")
        .arg("--hide-scrollbars");

    if config.headless() {
        config_builder = config_builder.headless_mode(HeadlessMode::default());
    } else {
        config_builder = config_builder.with_head();
    }

    let browser_config = config_builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(h) = handler.next().await {
            if let Err(e) = h {
                let error_msg = e.to_string();
                // Chrome sends CDP events chromiumoxide doesn't recognize;
                // those deserialization errors are noise, not failures.
                let is_benign = error_msg
                    .contains("data did not match any variant of untagged enum Message")
                    || error_msg.contains("Failed to deserialize WS response");
                if !is_benign {
                    log::error!("Browser handler error: {e:?}");
                }
            }
        }
        log::debug!("Browser handler task completed");
    });

    Ok(BrowserSession {
        browser,
        handler_task,
    })
}

/// Capture implementation backed by a live page session.
///
/// Both methods run JavaScript inside the page, which is the only
/// context where a `blob:` handle resolves.
pub struct CdpCapture {
    page: Page,
}

impl CdpCapture {
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self { page }
    }
}

impl EphemeralCapture for CdpCapture {
    fn capture_pixels(&self, url: &str) -> CaptureFuture<'_> {
        let script = pixel_export_script(url);
        Box::pin(async move { evaluate_string(&self.page, &script).await })
    }

    fn refetch(&self, url: &str) -> CaptureFuture<'_> {
        let script = refetch_script(url);
        Box::pin(async move { evaluate_string(&self.page, &script).await })
    }
}

/// Draw the already-decoded image through an in-memory canvas and export
/// the pixel buffer. Throws on cross-origin-tainted buffers, which the
/// caller treats as a fall-through to [`refetch_script`].
fn pixel_export_script(url: &str) -> String {
    let url_literal = serde_json::json!(url).to_string();
    format!(
        r"(async () => {{
            const img = new Image();
            img.crossOrigin = 'anonymous';
            await new Promise((resolve, reject) => {{
                img.onload = resolve;
                img.onerror = () => reject(new Error('image failed to load'));
                img.src = {url_literal};
            }});
            const canvas = document.createElement('canvas');
            canvas.width = img.naturalWidth;
            canvas.height = img.naturalHeight;
            canvas.getContext('2d').drawImage(img, 0, 0);
            return canvas.toDataURL('image/png');
        }})()"
    )
}

/// Fetch the ephemeral reference inside the page session and encode the
/// retrieved bytes as a data URL.
fn refetch_script(url: &str) -> String {
    let url_literal = serde_json::json!(url).to_string();
    format!(
        r"(async () => {{
            const response = await fetch({url_literal});
            if (!response.ok) throw new Error('fetch failed: ' + response.status);
            const blob = await response.blob();
            return await new Promise((resolve, reject) => {{
                const reader = new FileReader();
                reader.onloadend = () => resolve(reader.result);
                reader.onerror = () => reject(new Error('read failed'));
                reader.readAsDataURL(blob);
            }});
        }})()"
    )
}

async fn evaluate_string(page: &Page, script: &str) -> Result<String> {
    let value: serde_json::Value = page
        .evaluate(script)
        .await
        .context("Script evaluation failed")?
        .into_value()
        .map_err(|e| anyhow::anyhow!("Script returned no value: {e}"))?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        other => Err(anyhow::anyhow!("Script returned non-string value: {other}")),
    }
}

/// Capture the rendered markup of an already-open page.
///
/// Returns (markup, final URL): redirects may have moved the page, and
/// resource resolution must use the URL the document actually lives at.
pub async fn capture_page_html(page: &Page) -> SnapshotResult<(String, String)> {
    let html = evaluate_string(page, "document.documentElement.outerHTML")
        .await
        .map_err(|e| SnapshotError::BrowserError(format!("failed to capture markup: {e:#}")))?;
    let final_url = evaluate_string(page, "document.location.href")
        .await
        .map_err(|e| SnapshotError::BrowserError(format!("failed to read page URL: {e:#}")))?;
    Ok((html, final_url))
}

/// Snapshot a live URL end to end: launch, render, run the pipeline,
/// shut the browser down.
///
/// The browser stays open across the whole pipeline because ephemeral
/// capture during discovery needs the page session alive.
pub async fn snapshot_url(
    url: &str,
    config: &SnapshotConfig,
    progress: &dyn SnapshotProgress,
) -> SnapshotResult<GeneratedDocument> {
    let session = BrowserSession::launch(config).await?;

    let result = async {
        let page = session.open(url).await?;
        let (html, final_url) = capture_page_html(&page).await?;
        let capture = CdpCapture::new(page.clone());
        snapshot_page(&html, &final_url, config, &capture, progress).await
    }
    .await;

    // Close regardless of pipeline outcome; report the pipeline error first.
    let close_result = session.close().await;
    let document = result?;
    close_result?;
    Ok(document)
}
