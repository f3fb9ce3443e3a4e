//! Resource downloading and inline encoding
//!
//! Fetches each discovered URL with an explicit, ordered list of fetch
//! strategies (credentialed first, anonymous retry) and encodes the
//! result into the representation the assembler needs: base64 data URLs
//! for binary content, rewritten text for stylesheets, raw text for
//! scripts. Partial failure is expected and non-fatal — a failed URL is
//! simply absent from the returned map.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use base64::Engine;
use futures::future::join_all;
use reqwest::Client;

use super::css_rewriter::rewrite_stylesheet;
use super::types::{ResourceContentMap, ResourceError, ResourceKind};
use crate::config::SnapshotConfig;
use crate::progress::{SnapshotProgress, SnapshotStep};
use crate::utils::constants::CHROME_USER_AGENT;

/// One way of authenticating a resource fetch.
///
/// Strategies are tried in order until one succeeds. Credentialed fetches
/// are required for resources behind authentication, but origins serving
/// wildcard cross-origin headers reject credentialed requests — hence the
/// anonymous retry.
#[derive(Debug, Clone)]
pub enum FetchStrategy {
    /// Attach the caller's cookie header
    WithCredentials(String),
    /// Send no credentials
    Anonymous,
}

/// Derive the ordered strategy list from config.
///
/// Without a configured cookie header the credentialed attempt would be
/// byte-identical to the anonymous one, so it is elided.
#[must_use]
pub fn fetch_plan(config: &SnapshotConfig) -> Vec<FetchStrategy> {
    match config.cookie_header() {
        Some(header) => vec![
            FetchStrategy::WithCredentials(header.to_string()),
            FetchStrategy::Anonymous,
        ],
        None => vec![FetchStrategy::Anonymous],
    }
}

/// Build the shared HTTP client used for all resource fetches.
pub fn build_client(config: &SnapshotConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.fetch_timeout())
        .user_agent(CHROME_USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Accept header matching what a browser would send for this kind
fn accept_header(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Image => "image/avif,image/webp,image/apng,image/*,*/*;q=0.8",
        ResourceKind::Css => "text/css,*/*;q=0.1",
        ResourceKind::Script => "*/*;q=0.8",
    }
}

/// Fetch raw bytes plus the reported content type, trying each strategy
/// in order. A strategy fails on a network error or non-success status.
pub(crate) async fn fetch_bytes(
    client: &Client,
    url: &str,
    kind: ResourceKind,
    strategies: &[FetchStrategy],
) -> Result<(Vec<u8>, Option<String>)> {
    // Local pages reference the filesystem directly; no HTTP involved.
    if url.starts_with("file:") {
        return read_local_file(url).await;
    }

    let mut last_error = None;
    for strategy in strategies {
        let mut request = client.get(url).header("Accept", accept_header(kind));
        if let FetchStrategy::WithCredentials(cookie) = strategy {
            request = request.header("Cookie", cookie.clone());
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                let content_type = response
                    .headers()
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string());
                let bytes = response
                    .bytes()
                    .await
                    .context("Failed to read response body")?;
                return Ok((bytes.to_vec(), content_type));
            }
            Ok(response) => {
                log::debug!(
                    "Fetch of {url} via {strategy:?} failed with status {}",
                    response.status()
                );
                last_error = Some(anyhow::anyhow!(
                    "fetch failed with status {}",
                    response.status()
                ));
            }
            Err(e) => {
                log::debug!("Fetch of {url} via {strategy:?} errored: {e}");
                last_error = Some(anyhow::Error::from(e).context("request failed"));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no fetch strategy configured")))
}

async fn read_local_file(url: &str) -> Result<(Vec<u8>, Option<String>)> {
    let parsed = url::Url::parse(url).context("Invalid file URL")?;
    let path = parsed
        .to_file_path()
        .map_err(|()| anyhow::anyhow!("file URL has no local path: {url}"))?;
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read local file {}", path.display()))?;
    let content_type = guess_content_type(&path).map(str::to_string);
    Ok((bytes, content_type))
}

fn guess_content_type(path: &std::path::Path) -> Option<&'static str> {
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "ico" => Some("image/x-icon"),
        "css" => Some("text/css"),
        "js" | "mjs" => Some("text/javascript"),
        _ => None,
    }
}

/// Encode bytes as a self-describing base64 data URL.
pub fn encode_data_url(bytes: &[u8], content_type: &str) -> String {
    let encoded_capacity = base64::encoded_len(bytes.len(), false).unwrap_or(0);
    let mut encoded = String::with_capacity(encoded_capacity + 30 + content_type.len());

    encoded.push_str("data:");
    encoded.push_str(content_type);
    encoded.push_str(";base64,");

    // STANDARD encoding for best compatibility with browsers
    base64::engine::general_purpose::STANDARD.encode_string(bytes, &mut encoded);
    encoded
}

/// Decode a base64 data URL back into (bytes, content type).
///
/// Returns None for anything that is not a base64 data URL.
pub fn decode_data_url(data_url: &str) -> Option<(Vec<u8>, String)> {
    let rest = data_url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let content_type = meta.strip_suffix(";base64")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some((bytes, content_type.to_string()))
}

/// Fetch a single binary resource and return it as a data URL.
pub(crate) async fn fetch_data_url(
    client: &Client,
    url: &str,
    strategies: &[FetchStrategy],
    max_inline_size_bytes: Option<usize>,
) -> Result<String> {
    let (bytes, content_type) = fetch_bytes(client, url, ResourceKind::Image, strategies).await?;

    if let Some(max_size) = max_inline_size_bytes
        && bytes.len() > max_size
    {
        return Err(anyhow::anyhow!(
            "resource too large to inline: {} bytes (max: {max_size})",
            bytes.len()
        ));
    }

    let content_type = content_type.unwrap_or_else(|| "image/jpeg".to_string());
    Ok(encode_data_url(&bytes, &content_type))
}

/// Fetch a single text resource as UTF-8.
pub(crate) async fn fetch_text(
    client: &Client,
    url: &str,
    kind: ResourceKind,
    strategies: &[FetchStrategy],
) -> Result<String> {
    let (bytes, _content_type) = fetch_bytes(client, url, kind, strategies).await?;
    String::from_utf8(bytes).context("response body is not valid UTF-8")
}

/// Fetch every URL of one kind concurrently.
///
/// All URLs in the batch are issued at once with no concurrency cap; the
/// caller is responsible for not handing over pathologically large sets.
/// Returns the content map; failed URLs are logged and omitted.
pub async fn fetch_resources(
    client: &Client,
    urls: &HashSet<String>,
    kind: ResourceKind,
    config: &SnapshotConfig,
    progress: &dyn SnapshotProgress,
) -> ResourceContentMap {
    if urls.is_empty() {
        return HashMap::new();
    }

    progress.report(
        SnapshotStep::Fetching,
        &format!("Downloading {} {kind} resources", urls.len()),
    );

    let strategies = fetch_plan(config);
    let futures = urls.iter().map(|url| {
        let strategies = &strategies;
        async move {
            let result = match kind {
                ResourceKind::Image => {
                    fetch_data_url(
                        client,
                        url,
                        strategies,
                        config.max_inline_image_size_bytes(),
                    )
                    .await
                }
                ResourceKind::Css => match fetch_text(client, url, kind, strategies).await {
                    Ok(css_text) => {
                        // Stylesheets carry their own nested references;
                        // rewrite them before the assembler ever sees the text.
                        Ok(rewrite_stylesheet(
                            client,
                            &css_text,
                            url,
                            strategies,
                            config.max_inline_image_size_bytes(),
                        )
                        .await)
                    }
                    Err(e) => Err(e),
                },
                ResourceKind::Script => fetch_text(client, url, kind, strategies).await,
            };

            match result {
                Ok(content) => Some((url.clone(), content)),
                Err(e) => {
                    let failure = ResourceError {
                        url: url.clone(),
                        kind,
                        error: format!("{e:#}"),
                    };
                    log::warn!("Failed to fetch {failure}");
                    None
                }
            }
        }
    });

    let fetched: ResourceContentMap = join_all(futures).await.into_iter().flatten().collect();

    log::info!("Fetched {}/{} {kind} resources", fetched.len(), urls.len());
    fetched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_round_trip_preserves_bytes() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let encoded = encode_data_url(&bytes, "image/png");
        assert!(encoded.starts_with("data:image/png;base64,"));

        let (decoded, content_type) = decode_data_url(&encoded).unwrap();
        assert_eq!(decoded, bytes);
        assert_eq!(content_type, "image/png");
    }

    #[test]
    fn decode_rejects_non_base64_data_urls() {
        assert!(decode_data_url("data:text/plain,hello").is_none());
        assert!(decode_data_url("https://x.test/a.png").is_none());
    }

    #[test]
    fn plan_includes_credentials_only_when_configured() {
        let anonymous = crate::config::SnapshotConfigBuilder::new().build().unwrap();
        assert!(matches!(
            fetch_plan(&anonymous).as_slice(),
            [FetchStrategy::Anonymous]
        ));

        let with_cookie = crate::config::SnapshotConfigBuilder::new()
            .cookie_header("session=abc")
            .build()
            .unwrap();
        assert!(matches!(
            fetch_plan(&with_cookie).as_slice(),
            [FetchStrategy::WithCredentials(_), FetchStrategy::Anonymous]
        ));
    }
}
