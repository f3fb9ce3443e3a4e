//! Inline rewriting of url() references in stylesheet text
//!
//! Stylesheets reference further resources (backgrounds, fonts, icons)
//! relative to their own location. This module collects every distinct
//! non-inline url() token, resolves it against the stylesheet's base,
//! fetches it with the same strategy fallback as everything else, and
//! performs a single textual substitution pass. Tokens that could not be
//! retrieved are left byte-for-byte identical to the input.

use std::collections::HashMap;

use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;

use super::fetcher::{FetchStrategy, fetch_data_url};
use crate::utils::{is_inline_url, resolve_url};

lazy_static! {
    /// Matches `url(...)` with optional quotes around the token.
    /// Shared with the collector and assembler so every stage recognizes
    /// exactly the same references.
    pub(crate) static ref CSS_URL_RE: Regex =
        Regex::new(r#"url\(\s*["']?([^"')]+)["']?\s*\)"#)
            .expect("BUG: hardcoded css url() pattern is invalid");
}

/// Rewrite stylesheet text so url() references become data URLs.
///
/// Never fails: sub-resource fetch failures simply leave the original
/// token in place, and a stylesheet whose tokens are all inline already
/// comes back unchanged. Sub-resources obey the same inline size cap as
/// the plain image batch.
pub async fn rewrite_stylesheet(
    client: &Client,
    css_text: &str,
    css_base_url: &str,
    strategies: &[FetchStrategy],
    max_inline_size_bytes: Option<usize>,
) -> String {
    // Distinct original tokens → resolved absolute URL
    let mut token_map: HashMap<String, String> = HashMap::new();
    for caps in CSS_URL_RE.captures_iter(css_text) {
        let token = &caps[1];
        if is_inline_url(token) || token_map.contains_key(token) {
            continue;
        }
        match resolve_url(css_base_url, token) {
            Ok(absolute) => {
                token_map.insert(token.to_string(), absolute);
            }
            Err(e) => {
                log::debug!("Skipping unresolvable css url() token '{token}': {e:#}");
            }
        }
    }

    if token_map.is_empty() {
        return css_text.to_string();
    }

    // Fetch all sub-resources concurrently
    let futures = token_map.iter().map(|(token, absolute)| async move {
        match fetch_data_url(client, absolute, strategies, max_inline_size_bytes).await {
            Ok(data_url) => Some((token.clone(), data_url)),
            Err(e) => {
                log::warn!("Failed to inline css sub-resource {absolute}: {e:#}");
                None
            }
        }
    });
    let inlined: HashMap<String, String> = join_all(futures).await.into_iter().flatten().collect();

    // Single substitution pass; unresolved tokens pass through verbatim
    CSS_URL_RE
        .replace_all(css_text, |caps: &regex::Captures<'_>| {
            match inlined.get(&caps[1]) {
                Some(data_url) => format!("url(\"{data_url}\")"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
