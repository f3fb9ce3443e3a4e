//! Final document assembly
//!
//! Rewrites a clone of the captured page so every discovered reference
//! points at its fetched inline representation, neutralizes the page's
//! own dynamic-regeneration scripts, and serializes the result with a
//! doctype. The live page is never mutated: this stage re-parses the
//! captured markup into an owned tree and works only on that.
//!
//! Per-node problems (a malformed URL, a missing attribute) are caught
//! and skipped; only failures in the synchronous parse/serialize logic
//! abort the stage.

use std::collections::HashMap;

use anyhow::{Context, Result};
use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;

use super::collector::parse_srcset;
use super::css_rewriter::CSS_URL_RE;
use super::types::{FetchedContent, GeneratedDocument, SnapshotError, SnapshotResult};
use crate::progress::{SnapshotProgress, SnapshotStep};
use crate::utils::constants::{
    DISABLED_MARKER_ATTR, INJECTED_SCRIPT_CLASS_PREFIX, LAZY_LOAD_ATTRS, PROGRESS_PANEL_TAG,
    RESOLVED_MARKER_ATTR,
};
use crate::utils::{is_ephemeral_url, is_inline_url, resolve_url};

/// Produce the self-contained document from the captured markup and the
/// fetched content maps.
///
/// References without a fetched entry are left byte-for-byte untouched;
/// a partial snapshot beats no snapshot.
pub fn generate_html(
    html: &str,
    base_url: &str,
    content: &FetchedContent,
    placeholder_map: &HashMap<String, String>,
    ephemeral_map: &HashMap<String, String>,
    progress: &dyn SnapshotProgress,
) -> SnapshotResult<GeneratedDocument> {
    progress.report(SnapshotStep::Assembling, "Rewriting document");

    assemble(html, base_url, content, placeholder_map, ephemeral_map)
        .map_err(|e| SnapshotError::AssembleError(format!("{e:#}")))
}

fn assemble(
    html: &str,
    base_url: &str,
    content: &FetchedContent,
    placeholder_map: &HashMap<String, String>,
    ephemeral_map: &HashMap<String, String>,
) -> Result<GeneratedDocument> {
    // The owned clone. Everything below mutates this tree only.
    let document = kuchiki::parse_html().one(html);

    remove_progress_panel(&document)?;
    rewrite_images(&document, base_url, &content.images, placeholder_map, ephemeral_map)?;
    rewrite_srcsets(&document, base_url, &content.images)?;
    rewrite_favicons(&document, base_url, &content.images)?;
    inline_stylesheets(&document, base_url, &content.css)?;
    inline_scripts(&document, base_url, &content.scripts)?;
    disable_injected_scripts(&document)?;
    rewrite_style_attributes(&document, base_url, &content.images)?;
    rewrite_style_blocks(&document, base_url, &content.images)?;

    let title = document
        .select_first("title")
        .map(|t| t.text_contents().trim().to_string())
        .unwrap_or_default();

    Ok(GeneratedDocument {
        html: serialize_with_doctype(&document)?,
        title,
    })
}

/// Rule 1: the snapshot must not contain our own progress UI.
fn remove_progress_panel(document: &NodeRef) -> Result<()> {
    let matches: Vec<_> = document
        .select(PROGRESS_PANEL_TAG)
        .map_err(|()| anyhow::anyhow!("Invalid progress panel selector"))?
        .collect();
    for node_ref in matches {
        node_ref.as_node().detach();
    }
    Ok(())
}

/// Rules 2–3: substitute ephemeral and plain image sources.
///
/// Ephemeral sources come from the capture map built during discovery;
/// plain sources from the fetched image map, with the placeholder map as
/// a fallback for images the page has not lazily substituted yet.
fn rewrite_images(
    document: &NodeRef,
    base_url: &str,
    images: &HashMap<String, String>,
    placeholder_map: &HashMap<String, String>,
    ephemeral_map: &HashMap<String, String>,
) -> Result<()> {
    // Attribute-only mutation, but collect anyway so the borrow of each
    // node's attributes stays local to one iteration.
    let matches: Vec<_> = document
        .select("img[src]")
        .map_err(|()| anyhow::anyhow!("Invalid img selector"))?
        .collect();

    for node_ref in matches {
        let src = {
            let attrs = node_ref.attributes.borrow();
            attrs.get("src").map(std::string::ToString::to_string)
        };
        let Some(src) = src else { continue };

        if is_inline_url(&src) {
            continue;
        }

        let replacement = if is_ephemeral_url(&src) {
            ephemeral_map.get(&src).cloned()
        } else {
            lookup_image(&src, base_url, images, placeholder_map)
        };

        if let Some(data_url) = replacement {
            let mut attrs = node_ref.attributes.borrow_mut();
            attrs.insert("src", data_url);
            // Mark as resolved and strip lazy-load hooks so the page's
            // own scripts cannot reprocess the element back to a
            // placeholder.
            attrs.insert(RESOLVED_MARKER_ATTR, "true".to_string());
            for lazy_attr in LAZY_LOAD_ATTRS {
                attrs.remove(lazy_attr);
            }
        }
    }
    Ok(())
}

/// Resolve a plain image source to its fetched data URL, if any.
fn lookup_image(
    src: &str,
    base_url: &str,
    images: &HashMap<String, String>,
    placeholder_map: &HashMap<String, String>,
) -> Option<String> {
    if let Ok(absolute) = resolve_url(base_url, src)
        && let Some(data_url) = images.get(&absolute)
    {
        return Some(data_url.clone());
    }

    // The source may still be a generation key the page never got to
    // substitute; follow the placeholder map to the resolved URL.
    let resolved = placeholder_map.get(src)?;
    if is_inline_url(resolved) {
        return Some(resolved.clone());
    }
    images.get(resolved).cloned()
}

/// Rule 4: rebuild responsive source-sets entry by entry.
fn rewrite_srcsets(
    document: &NodeRef,
    base_url: &str,
    images: &HashMap<String, String>,
) -> Result<()> {
    let matches: Vec<_> = document
        .select("source[srcset]")
        .map_err(|()| anyhow::anyhow!("Invalid srcset selector"))?
        .collect();

    for node_ref in matches {
        let srcset = {
            let attrs = node_ref.attributes.borrow();
            attrs.get("srcset").map(std::string::ToString::to_string)
        };
        let Some(srcset) = srcset else { continue };

        let rebuilt: Vec<String> = parse_srcset(&srcset)
            .into_iter()
            .map(|(entry_url, descriptor)| {
                if !is_inline_url(&entry_url)
                    && let Ok(absolute) = resolve_url(base_url, &entry_url)
                    && let Some(data_url) = images.get(&absolute)
                {
                    // Descriptor text preserved verbatim
                    return format!("{data_url}{descriptor}");
                }
                format!("{entry_url}{descriptor}")
            })
            .collect();

        let mut attrs = node_ref.attributes.borrow_mut();
        attrs.insert("srcset", rebuilt.join(", "));
    }
    Ok(())
}

/// Rule 5: favicon link targets.
fn rewrite_favicons(
    document: &NodeRef,
    base_url: &str,
    images: &HashMap<String, String>,
) -> Result<()> {
    let matches: Vec<_> = document
        .select("link[rel=\"icon\"], link[rel=\"shortcut icon\"], link[rel=\"apple-touch-icon\"]")
        .map_err(|()| anyhow::anyhow!("Invalid favicon selector"))?
        .collect();

    for node_ref in matches {
        let href = {
            let attrs = node_ref.attributes.borrow();
            attrs.get("href").map(std::string::ToString::to_string)
        };
        let Some(href) = href else { continue };
        if is_inline_url(&href) {
            continue;
        }
        if let Ok(absolute) = resolve_url(base_url, &href)
            && let Some(data_url) = images.get(&absolute)
        {
            let mut attrs = node_ref.attributes.borrow_mut();
            attrs.insert("href", data_url.clone());
        }
    }
    Ok(())
}

/// Rule 6: external stylesheet links become inline style elements.
fn inline_stylesheets(
    document: &NodeRef,
    base_url: &str,
    css: &HashMap<String, String>,
) -> Result<()> {
    // Must collect nodes before iteration because we call node.detach()
    // during iteration, which invalidates the iterator.
    let matches: Vec<_> = document
        .select("link[rel=\"stylesheet\"][href]")
        .map_err(|()| anyhow::anyhow!("Invalid stylesheet selector"))?
        .collect();

    for node_ref in matches {
        let (href, media) = {
            let attrs = node_ref.attributes.borrow();
            (
                attrs.get("href").map(std::string::ToString::to_string),
                attrs.get("media").map(std::string::ToString::to_string),
            )
        };
        let Some(href) = href else { continue };
        if is_inline_url(&href) {
            continue;
        }
        let Ok(absolute) = resolve_url(base_url, &href) else {
            continue;
        };
        let Some(css_text) = css.get(&absolute) else {
            continue;
        };

        let Some(style) = build_element("<style></style>", "style") else {
            continue;
        };
        style.append(NodeRef::new_text(css_text.clone()));
        if let Some(media_value) = media {
            if let Some(element) = style.as_element() {
                element.attributes.borrow_mut().insert("media", media_value);
            }
        }

        let node = node_ref.as_node();
        node.insert_before(style);
        node.detach();
    }
    Ok(())
}

/// Rule 7: external scripts become inline script elements, keeping their
/// execution-affecting attributes.
fn inline_scripts(
    document: &NodeRef,
    base_url: &str,
    scripts: &HashMap<String, String>,
) -> Result<()> {
    let matches: Vec<_> = document
        .select("script[src]")
        .map_err(|()| anyhow::anyhow!("Invalid script selector"))?
        .collect();

    for node_ref in matches {
        let src = {
            let attrs = node_ref.attributes.borrow();
            attrs.get("src").map(std::string::ToString::to_string)
        };
        let Some(src) = src else { continue };
        if is_inline_url(&src) {
            continue;
        }
        let Ok(absolute) = resolve_url(base_url, &src) else {
            continue;
        };
        let Some(script_text) = scripts.get(&absolute) else {
            continue;
        };

        let Some(inline) = build_element("<script></script>", "script") else {
            continue;
        };
        inline.append(NodeRef::new_text(script_text.clone()));
        if let Some(element) = inline.as_element() {
            let mut new_attrs = element.attributes.borrow_mut();
            let old_attrs = node_ref.attributes.borrow();
            if let Some(script_type) = old_attrs.get("type")
                && script_type != "text/javascript"
            {
                new_attrs.insert("type", script_type.to_string());
            }
            for attr in ["defer", "async", "nomodule"] {
                if let Some(value) = old_attrs.get(attr) {
                    new_attrs.insert(attr, value.to_string());
                }
            }
        }

        let node = node_ref.as_node();
        node.insert_before(inline);
        node.detach();
    }
    Ok(())
}

/// Rule 8: neutralize the page's injected regeneration scripts.
///
/// Every image (ephemeral ones included) is already inlined; left
/// enabled, these scripts would swap the data URLs back to placeholders
/// on load.
fn disable_injected_scripts(document: &NodeRef) -> Result<()> {
    let selector = format!("script[class^=\"{INJECTED_SCRIPT_CLASS_PREFIX}\"]");
    let matches: Vec<_> = document
        .select(&selector)
        .map_err(|()| anyhow::anyhow!("Invalid injected script selector"))?
        .collect();

    if !matches.is_empty() {
        log::debug!("Disabling {} injected scripts", matches.len());
    }
    for node_ref in matches {
        let mut attrs = node_ref.attributes.borrow_mut();
        attrs.insert("type", "text/plain".to_string());
        attrs.insert(DISABLED_MARKER_ATTR, "true".to_string());
    }
    Ok(())
}

/// Rule 9a: url() references inside inline style attributes.
fn rewrite_style_attributes(
    document: &NodeRef,
    base_url: &str,
    images: &HashMap<String, String>,
) -> Result<()> {
    let matches: Vec<_> = document
        .select("[style]")
        .map_err(|()| anyhow::anyhow!("Invalid style attribute selector"))?
        .collect();

    for node_ref in matches {
        let style = {
            let attrs = node_ref.attributes.borrow();
            attrs.get("style").map(std::string::ToString::to_string)
        };
        let Some(style) = style else { continue };
        if !style.contains("url(") {
            continue;
        }

        let rewritten = substitute_css_urls(&style, base_url, images);
        if rewritten != style {
            let mut attrs = node_ref.attributes.borrow_mut();
            attrs.insert("style", rewritten);
        }
    }
    Ok(())
}

/// Rule 9b: url() references inside style blocks.
fn rewrite_style_blocks(
    document: &NodeRef,
    base_url: &str,
    images: &HashMap<String, String>,
) -> Result<()> {
    let matches: Vec<_> = document
        .select("style")
        .map_err(|()| anyhow::anyhow!("Invalid style selector"))?
        .collect();

    for node_ref in matches {
        let node = node_ref.as_node();
        let css_text = node.text_contents();
        if !css_text.contains("url(") {
            continue;
        }

        let rewritten = substitute_css_urls(&css_text, base_url, images);
        if rewritten != css_text {
            // Swap the element's text children for the rewritten css
            let children: Vec<_> = node.children().collect();
            for child in children {
                child.detach();
            }
            node.append(NodeRef::new_text(rewritten));
        }
    }
    Ok(())
}

/// Substitution rule shared by rules 9a/9b: same pattern as the Style
/// Rewriter, but fed exclusively from the already-fetched image map —
/// assembly never performs new fetches.
fn substitute_css_urls(css: &str, base_url: &str, images: &HashMap<String, String>) -> String {
    CSS_URL_RE
        .replace_all(css, |caps: &regex::Captures<'_>| {
            let token = &caps[1];
            if !is_inline_url(token)
                && let Ok(absolute) = resolve_url(base_url, token)
                && let Some(data_url) = images.get(&absolute)
            {
                return format!("url(\"{data_url}\")");
            }
            caps[0].to_string()
        })
        .into_owned()
}

/// Parse a small fragment and pull out the one element we built.
fn build_element(fragment_html: &str, selector: &str) -> Option<NodeRef> {
    let fragment = kuchiki::parse_html().one(fragment_html.to_string());
    let node = fragment.select_first(selector).ok()?.as_node().clone();
    node.detach();
    Some(node)
}

/// Rule 10: serialize the root element with a leading doctype.
fn serialize_with_doctype(document: &NodeRef) -> Result<String> {
    let mut output = Vec::new();
    match document.select_first("html") {
        Ok(root) => root
            .as_node()
            .serialize(&mut output)
            .context("Failed to serialize document")?,
        Err(()) => document
            .serialize(&mut output)
            .context("Failed to serialize document")?,
    }
    let markup = String::from_utf8(output).context("Serialized markup is not valid UTF-8")?;
    Ok(format!("<!DOCTYPE html>\n{markup}"))
}
