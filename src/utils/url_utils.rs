//! Utility functions for URL handling and filename generation
//!
//! This module contains common utility functions used across the snapshot
//! pipeline.

use anyhow::{Context, Result};
use url::Url;

/// Resolve a potentially relative URL against a base URL
///
/// This function ensures proper percent-encoding of query parameters,
/// fixing issues with URLs from HTML that have unencoded special characters
/// (e.g., Google Fonts URLs with `:`, `,`, `@`, `;` in query strings).
pub fn resolve_url(base_url: &str, url: &str) -> Result<String> {
    let base = Url::parse(base_url).context("Invalid base URL")?;
    let mut resolved = base.join(url).context("Failed to resolve URL")?;

    // Re-encode query string to fix unencoded special characters from HTML
    // Some servers (like Google Fonts) strictly require proper percent-encoding
    if resolved.query().is_some() {
        // Collect query pairs into owned strings to avoid borrow conflicts
        let query_pairs: Vec<(String, String)> = resolved
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        resolved.query_pairs_mut().clear();
        for (key, value) in query_pairs {
            resolved.query_pairs_mut().append_pair(&key, &value);
        }
    }

    Ok(resolved.to_string())
}

/// True for sources that are already self-contained and must not be fetched.
pub fn is_inline_url(url: &str) -> bool {
    url.starts_with("data:")
}

/// True for session-scoped object references handled by the ephemeral
/// capture path, never by the plain fetcher.
pub fn is_ephemeral_url(url: &str) -> bool {
    url.starts_with("blob:")
}

/// Build a safe local filename from a page title.
///
/// Falls back to "page" for empty titles and caps length so the result
/// stays usable across filesystems.
pub fn filename_from_title(title: &str, extension: &str) -> String {
    let base = if title.trim().is_empty() {
        "page".to_string()
    } else {
        sanitize_filename::sanitize(title.trim().replace(char::is_whitespace, "_"))
    };
    let mut base = base;
    if base.len() > 100 {
        // Truncate on a char boundary so multibyte titles stay valid UTF-8
        let cut = (0..=100).rev().find(|i| base.is_char_boundary(*i)).unwrap_or(0);
        base.truncate(cut);
    }
    format!("{base}.{extension}")
}
