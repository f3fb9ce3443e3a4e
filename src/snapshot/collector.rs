//! Resource discovery over the captured document
//!
//! One synchronous, side-effect-free scan of the page markup that
//! enumerates every external resource reference, classifies it by kind,
//! and normalizes it to an absolute URL. Ephemeral `blob:` images are the
//! one exception to "no side effects": their bytes are captured eagerly
//! here because the references die with the page session.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};

use super::css_rewriter::CSS_URL_RE;
use super::ephemeral::{EphemeralCapture, capture_ephemeral};
use super::types::{CollectedResources, SnapshotError, SnapshotResult};
use crate::progress::{SnapshotProgress, SnapshotStep};
use crate::utils::constants::{INJECTED_SCRIPT_CLASS_PREFIX, PLACEHOLDER_MAP_IDENT};
use crate::utils::{is_ephemeral_url, is_inline_url, resolve_url};

lazy_static! {
    // These selectors are hardcoded and syntactically valid CSS selectors.
    // If they fail to parse, it indicates a compile-time bug in the selector strings.
    static ref INJECTED_SCRIPT_SELECTOR: Selector =
        Selector::parse(&format!("script[class^=\"{INJECTED_SCRIPT_CLASS_PREFIX}\"]"))
            .expect("BUG: hardcoded injected-script selector is invalid");

    static ref IMG_SELECTOR: Selector =
        Selector::parse("img[src]").expect("BUG: hardcoded selector 'img[src]' is invalid");

    static ref SRCSET_SELECTOR: Selector = Selector::parse("source[srcset]")
        .expect("BUG: hardcoded selector 'source[srcset]' is invalid");

    static ref FAVICON_SELECTOR: Selector = Selector::parse(
        "link[rel=\"icon\"], link[rel=\"shortcut icon\"], link[rel=\"apple-touch-icon\"]"
    )
    .expect("BUG: hardcoded favicon selector is invalid");

    static ref STYLESHEET_SELECTOR: Selector = Selector::parse("link[rel=\"stylesheet\"][href]")
        .expect("BUG: hardcoded stylesheet selector is invalid");

    static ref SCRIPT_SRC_SELECTOR: Selector =
        Selector::parse("script[src]").expect("BUG: hardcoded selector 'script[src]' is invalid");

    static ref STYLED_SELECTOR: Selector =
        Selector::parse("[style]").expect("BUG: hardcoded selector '[style]' is invalid");

    static ref STYLE_BLOCK_SELECTOR: Selector =
        Selector::parse("style").expect("BUG: hardcoded selector 'style' is invalid");

    static ref TITLE_SELECTOR: Selector =
        Selector::parse("title").expect("BUG: hardcoded selector 'title' is invalid");

    /// Bounded match of the single generation-key map assignment inside an
    /// injected script. `[^;]+` keeps the match from running past the
    /// statement; anything fancier than one object literal is skipped.
    static ref PLACEHOLDER_MAP_RE: Regex =
        Regex::new(&format!(r"{PLACEHOLDER_MAP_IDENT}\s*=\s*(\{{[^;]+\}})"))
            .expect("BUG: hardcoded placeholder-map pattern is invalid");
}

/// Split a srcset attribute into (url, trailing descriptor) entries.
///
/// Each comma-separated entry starts with a URL token; whatever follows
/// (width/density descriptor, including its leading whitespace) is
/// preserved verbatim so the assembler can rebuild the list byte-exactly
/// for unresolved entries.
pub(crate) fn parse_srcset(srcset: &str) -> Vec<(String, String)> {
    srcset
        .split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.split_once(char::is_whitespace) {
                Some((url, descriptor)) => {
                    Some((url.to_string(), format!(" {}", descriptor.trim_start())))
                }
                None => Some((trimmed.to_string(), String::new())),
            }
        })
        .collect()
}

/// Scan the captured document and produce the full resource inventory.
///
/// All returned URLs are absolute; downstream stages rely on that and
/// never resolve anything themselves. A page with zero external
/// resources yields empty sets and a title — not an error.
pub async fn collect_resources(
    html: &str,
    base_url: &str,
    is_local_file: bool,
    capture: &dyn EphemeralCapture,
    progress: &dyn SnapshotProgress,
) -> SnapshotResult<CollectedResources> {
    progress.report(SnapshotStep::Collecting, "Scanning page for resources");

    // Validate the base up front so every later resolution failure is a
    // per-reference problem, not a stage failure.
    url::Url::parse(base_url)
        .map_err(|e| SnapshotError::CollectError(format!("invalid base URL '{base_url}': {e}")))?;

    // The parsed document is !Send, so the synchronous scan runs in its
    // own scope and is dropped before any capture await below.
    let (mut collected, blob_urls) = scan_document(html, base_url, is_local_file);

    // Capture-before-transform: blob sources are materialized now, while
    // the page session that owns them still exists.
    for blob_url in blob_urls {
        if let Some(data_url) = capture_ephemeral(capture, &blob_url).await {
            collected.ephemeral_map.insert(blob_url, data_url);
        }
    }

    log::info!(
        "Collected {} images, {} stylesheets, {} scripts, {} placeholder entries, {} ephemeral captures",
        collected.image_urls.len(),
        collected.css_urls.len(),
        collected.script_urls.len(),
        collected.placeholder_map.len(),
        collected.ephemeral_map.len(),
    );

    Ok(collected)
}

/// Synchronous discovery pass. Returns the inventory plus the list of
/// blob: sources still needing capture.
fn scan_document(
    html: &str,
    base_url: &str,
    is_local_file: bool,
) -> (CollectedResources, Vec<String>) {
    let document = Html::parse_document(html);
    let mut collected = CollectedResources::default();
    let mut blob_urls = Vec::new();

    // A remote page cannot legitimately reference local files; only keep
    // file: URLs when the page itself came from disk.
    let add_image = |collected: &mut CollectedResources, raw: &str| {
        add_resolved(&mut collected.image_urls, base_url, raw, is_local_file);
    };

    // Generation-key map from injected scripts. One bounded regex match
    // per script, parsed as JSON; parse failure skips the script silently
    // with no partial extraction.
    for script in document.select(&INJECTED_SCRIPT_SELECTOR) {
        let content: String = script.text().collect();
        let Some(m) = PLACEHOLDER_MAP_RE.captures(&content) else {
            continue;
        };
        match serde_json::from_str::<std::collections::HashMap<String, String>>(&m[1]) {
            Ok(map) => {
                for (key, resolved_url) in map {
                    if !is_inline_url(&resolved_url) {
                        add_image(&mut collected, &resolved_url);
                    }
                    collected.placeholder_map.insert(key, resolved_url);
                }
            }
            Err(e) => {
                log::debug!("Skipping injected script with unparseable {PLACEHOLDER_MAP_IDENT}: {e}");
            }
        }
    }

    // Image sources: blob: goes to the ephemeral path, data: is already
    // inline, everything else joins the fetch set.
    for img in document.select(&IMG_SELECTOR) {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        if is_ephemeral_url(src) {
            blob_urls.push(src.to_string());
        } else if !is_inline_url(src) {
            add_image(&mut collected, src);
        }
    }

    // Responsive source-set entries: leading URL token per entry
    for source in document.select(&SRCSET_SELECTOR) {
        if let Some(srcset) = source.value().attr("srcset") {
            for (entry_url, _descriptor) in parse_srcset(srcset) {
                if !is_inline_url(&entry_url) {
                    add_image(&mut collected, &entry_url);
                }
            }
        }
    }

    // Favicons
    for favicon in document.select(&FAVICON_SELECTOR) {
        if let Some(href) = favicon.value().attr("href")
            && !is_inline_url(href)
        {
            add_image(&mut collected, href);
        }
    }

    // External stylesheets
    for link in document.select(&STYLESHEET_SELECTOR) {
        if let Some(href) = link.value().attr("href")
            && !is_inline_url(href)
        {
            add_resolved(&mut collected.css_urls, base_url, href, is_local_file);
        }
    }

    // External scripts
    for script in document.select(&SCRIPT_SRC_SELECTOR) {
        if let Some(src) = script.value().attr("src")
            && !is_inline_url(src)
        {
            add_resolved(&mut collected.script_urls, base_url, src, is_local_file);
        }
    }

    // url() references inside inline style attributes
    for element in document.select(&STYLED_SELECTOR) {
        if let Some(style) = element.value().attr("style") {
            for caps in CSS_URL_RE.captures_iter(style) {
                if !is_inline_url(&caps[1]) {
                    add_image(&mut collected, &caps[1]);
                }
            }
        }
    }

    // url() references inside style blocks
    for style_block in document.select(&STYLE_BLOCK_SELECTOR) {
        let content: String = style_block.text().collect();
        for caps in CSS_URL_RE.captures_iter(&content) {
            if !is_inline_url(&caps[1]) {
                add_image(&mut collected, &caps[1]);
            }
        }
    }

    collected.title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    (collected, blob_urls)
}

/// Resolve one reference and insert it into the kind set. Resolution
/// failures are per-reference: logged and skipped.
fn add_resolved(set: &mut HashSet<String>, base_url: &str, raw: &str, is_local_file: bool) {
    match resolve_url(base_url, raw) {
        Ok(absolute) => {
            if absolute.starts_with("file:") && !is_local_file {
                log::debug!("Skipping local file reference on remote page: {absolute}");
                return;
            }
            set.insert(absolute);
        }
        Err(e) => {
            log::warn!("Failed to resolve resource URL '{raw}': {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoOpProgress;
    use crate::snapshot::ephemeral::NoEphemeralCapture;

    async fn collect(html: &str) -> CollectedResources {
        collect_resources(
            html,
            "https://x.test/page/",
            false,
            &NoEphemeralCapture,
            &NoOpProgress,
        )
        .await
        .unwrap()
    }

    #[test]
    fn srcset_entries_split_url_and_descriptor() {
        let entries = parse_srcset("a.jpg 1x, b.jpg 2x");
        assert_eq!(
            entries,
            vec![
                ("a.jpg".to_string(), " 1x".to_string()),
                ("b.jpg".to_string(), " 2x".to_string()),
            ]
        );

        let bare = parse_srcset("only.png");
        assert_eq!(bare, vec![("only.png".to_string(), String::new())]);
    }

    #[tokio::test]
    async fn empty_page_returns_empty_sets_and_title() {
        let collected = collect("<html><head><title>Bare</title></head><body>hi</body></html>").await;
        assert_eq!(collected.title, "Bare");
        assert_eq!(collected.total_urls(), 0);
        assert!(collected.placeholder_map.is_empty());
        assert!(collected.ephemeral_map.is_empty());
    }

    #[tokio::test]
    async fn collects_and_normalizes_all_kinds() {
        let html = r#"<html><head>
            <title>Kinds</title>
            <link rel="stylesheet" href="style.css">
            <link rel="icon" href="/favicon.ico">
            <script src="../app.js"></script>
            </head><body>
            <img src="img/a.png">
            <img src="data:image/gif;base64,R0lGOD">
            <picture><source srcset="small.jpg 1x, large.jpg 2x"></picture>
            <div style="background:url(bg.png)"></div>
            <style>.hero{background:url('hero.jpg')}</style>
            </body></html>"#;
        let collected = collect(html).await;

        assert!(collected.css_urls.contains("https://x.test/page/style.css"));
        assert!(collected.script_urls.contains("https://x.test/app.js"));
        assert!(collected.image_urls.contains("https://x.test/favicon.ico"));
        assert!(collected.image_urls.contains("https://x.test/page/img/a.png"));
        assert!(collected.image_urls.contains("https://x.test/page/small.jpg"));
        assert!(collected.image_urls.contains("https://x.test/page/large.jpg"));
        assert!(collected.image_urls.contains("https://x.test/page/bg.png"));
        assert!(collected.image_urls.contains("https://x.test/page/hero.jpg"));
        // data: source excluded
        assert_eq!(collected.image_urls.len(), 6);
    }

    #[tokio::test]
    async fn extracts_placeholder_map_from_injected_scripts() {
        let html = r#"<html><head><title>P</title></head><body>
            <script class="injected-loader">
              var IMG_GEN_REPLACE_MAP = {"a red fox": "https://cdn.x.test/fox.png",
                                          "inline one": "data:image/png;base64,AA"};
            </script>
            <script class="injected-broken">IMG_GEN_REPLACE_MAP = {not json};</script>
            </body></html>"#;
        let collected = collect(html).await;

        assert_eq!(collected.placeholder_map.len(), 2);
        assert_eq!(
            collected.placeholder_map["a red fox"],
            "https://cdn.x.test/fox.png"
        );
        // resolved non-inline URL joins the image fetch set, inline one does not
        assert!(collected.image_urls.contains("https://cdn.x.test/fox.png"));
        assert_eq!(collected.image_urls.len(), 1);
    }

    #[tokio::test]
    async fn blob_images_skip_fetch_set_and_fail_without_session() {
        let html = r#"<html><head><title>B</title></head>
            <body><img src="blob:https://x.test/123"></body></html>"#;
        let collected = collect(html).await;

        // NoEphemeralCapture cannot materialize the handle
        assert!(collected.ephemeral_map.is_empty());
        assert!(collected.image_urls.is_empty());
    }

    #[tokio::test]
    async fn invalid_base_url_is_a_stage_failure() {
        let err = collect_resources(
            "<html></html>",
            "not a url",
            false,
            &NoEphemeralCapture,
            &NoOpProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SnapshotError::CollectError(_)));
    }

    #[tokio::test]
    async fn file_refs_dropped_on_remote_pages() {
        let html = r#"<html><body><img src="file:///etc/logo.png"></body></html>"#;
        let collected = collect(html).await;
        assert!(collected.image_urls.is_empty());
    }
}
