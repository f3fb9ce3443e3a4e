//! Document assembly scenarios: rewrite rules, partial results, and
//! serialization.

use std::collections::HashMap;

use pagesnap::progress::NoOpProgress;
use pagesnap::snapshot::{FetchedContent, generate_html};

const BASE: &str = "https://x.test/page/";

fn empty_maps() -> (HashMap<String, String>, HashMap<String, String>) {
    (HashMap::new(), HashMap::new())
}

#[test]
fn output_starts_with_doctype() {
    let (placeholders, ephemerals) = empty_maps();
    let doc = generate_html(
        "<html><head><title>T</title></head><body>hi</body></html>",
        BASE,
        &FetchedContent::default(),
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.starts_with("<!DOCTYPE html>\n<html"));
    assert_eq!(doc.title, "T");
}

#[test]
fn fetched_image_sources_become_data_urls() {
    let (placeholders, ephemerals) = empty_maps();
    let mut content = FetchedContent::default();
    content.images.insert(
        "https://x.test/page/img/a.png".to_string(),
        "data:image/png;base64,AAAA".to_string(),
    );

    let doc = generate_html(
        r#"<html><body><img src="img/a.png" data-src="img/a.png"></body></html>"#,
        BASE,
        &content,
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.contains(r#"src="data:image/png;base64,AAAA""#));
    assert!(doc.html.contains(r#"data-downloaded="true""#));
    // lazy-load hook stripped so page scripts cannot reprocess the element
    assert!(!doc.html.contains("data-src"));
}

#[test]
fn failed_fetch_leaves_reference_untouched() {
    let (placeholders, ephemerals) = empty_maps();
    let doc = generate_html(
        r#"<html><body><img src="img/missing.png"></body></html>"#,
        BASE,
        &FetchedContent::default(),
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.contains(r#"<img src="img/missing.png">"#));
    assert!(!doc.html.contains("data-downloaded"));
}

#[test]
fn ephemeral_images_substitute_from_capture_map() {
    let placeholders = HashMap::new();
    let mut ephemerals = HashMap::new();
    ephemerals.insert(
        "blob:https://x.test/abc-123".to_string(),
        "data:image/png;base64,CAPTURED".to_string(),
    );

    let doc = generate_html(
        r#"<html><body><img src="blob:https://x.test/abc-123" go-data-src="x"></body></html>"#,
        BASE,
        &FetchedContent::default(),
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.contains("data:image/png;base64,CAPTURED"));
    assert!(doc.html.contains(r#"data-downloaded="true""#));
    assert!(!doc.html.contains("go-data-src"));
    assert!(!doc.html.contains("blob:"));
}

#[test]
fn uncaptured_ephemeral_reference_is_left_as_is() {
    let (placeholders, ephemerals) = empty_maps();
    let doc = generate_html(
        r#"<html><body><img src="blob:https://x.test/gone"></body></html>"#,
        BASE,
        &FetchedContent::default(),
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.contains(r#"src="blob:https://x.test/gone""#));
}

#[test]
fn partially_resolved_srcset_rebuilds_entry_by_entry() {
    let (placeholders, ephemerals) = empty_maps();
    let mut content = FetchedContent::default();
    content.images.insert(
        "https://x.test/page/a.jpg".to_string(),
        "data:image/jpeg;base64,AA".to_string(),
    );

    let doc = generate_html(
        r#"<html><body><picture><source srcset="a.jpg 1x, b.jpg 2x"></picture></body></html>"#,
        BASE,
        &content,
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(
        doc.html
            .contains(r#"srcset="data:image/jpeg;base64,AA 1x, b.jpg 2x""#)
    );
}

#[test]
fn stylesheet_links_become_style_elements_preserving_media() {
    let (placeholders, ephemerals) = empty_maps();
    let mut content = FetchedContent::default();
    content.css.insert(
        "https://x.test/page/print.css".to_string(),
        "body{color:black}".to_string(),
    );

    let doc = generate_html(
        r#"<html><head><link rel="stylesheet" href="print.css" media="print"></head><body></body></html>"#,
        BASE,
        &content,
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(!doc.html.contains("<link"));
    assert!(doc.html.contains("body{color:black}"));
    assert!(doc.html.contains(r#"media="print""#));
}

#[test]
fn unfetched_stylesheet_link_survives() {
    let (placeholders, ephemerals) = empty_maps();
    let doc = generate_html(
        r#"<html><head><link rel="stylesheet" href="missing.css"></head><body></body></html>"#,
        BASE,
        &FetchedContent::default(),
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.contains("<link"));
    assert!(doc.html.contains(r#"href="missing.css""#));
}

#[test]
fn external_scripts_inline_and_keep_execution_attributes() {
    let (placeholders, ephemerals) = empty_maps();
    let mut content = FetchedContent::default();
    content.scripts.insert(
        "https://x.test/app.js".to_string(),
        "console.log('hi');".to_string(),
    );

    let doc = generate_html(
        r#"<html><body><script src="/app.js" type="module" defer=""></script></body></html>"#,
        BASE,
        &content,
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.contains("console.log('hi');"));
    assert!(doc.html.contains(r#"type="module""#));
    assert!(doc.html.contains("defer"));
    assert!(!doc.html.contains("src=\"/app.js\""));
}

#[test]
fn injected_scripts_are_neutralized_in_place() {
    let (placeholders, ephemerals) = empty_maps();
    let doc = generate_html(
        r#"<html><body><script class="injected-regen">regenerate();</script></body></html>"#,
        BASE,
        &FetchedContent::default(),
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    // Disabled, not removed: the markup stays inspectable
    assert!(doc.html.contains("regenerate();"));
    assert!(doc.html.contains(r#"type="text/plain""#));
    assert!(doc.html.contains(r#"data-disabled-by-pagesnap="true""#));
}

#[test]
fn style_attributes_and_blocks_rewrite_url_references() {
    let (placeholders, ephemerals) = empty_maps();
    let mut content = FetchedContent::default();
    content.images.insert(
        "https://x.test/page/bg.png".to_string(),
        "data:image/png;base64,BG".to_string(),
    );
    content.images.insert(
        "https://x.test/page/hero.jpg".to_string(),
        "data:image/jpeg;base64,HERO".to_string(),
    );

    let doc = generate_html(
        concat!(
            "<html><head><style>.hero{background:url('hero.jpg')}</style></head>",
            r#"<body><div style="background:url(bg.png)"></div></body></html>"#,
        ),
        BASE,
        &content,
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.contains(r#"url(&quot;data:image/png;base64,BG&quot;)"#)
        || doc.html.contains(r#"url("data:image/png;base64,BG")"#));
    assert!(doc.html.contains(r#"url("data:image/jpeg;base64,HERO")"#));
    assert!(!doc.html.contains("url('hero.jpg')"));
}

#[test]
fn favicon_links_rewrite_to_data_urls() {
    let (placeholders, ephemerals) = empty_maps();
    let mut content = FetchedContent::default();
    content.images.insert(
        "https://x.test/favicon.ico".to_string(),
        "data:image/x-icon;base64,FAV".to_string(),
    );

    let doc = generate_html(
        r#"<html><head><link rel="icon" href="/favicon.ico"></head><body></body></html>"#,
        BASE,
        &content,
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.contains(r#"href="data:image/x-icon;base64,FAV""#));
}

#[test]
fn progress_panel_is_removed_from_snapshot() {
    let (placeholders, ephemerals) = empty_maps();
    let doc = generate_html(
        "<html><body><pagesnap-progress>saving...</pagesnap-progress><p>content</p></body></html>",
        BASE,
        &FetchedContent::default(),
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(!doc.html.contains("pagesnap-progress"));
    assert!(doc.html.contains("<p>content</p>"));
}

#[test]
fn placeholder_key_sources_substitute_through_the_map() {
    let mut placeholders = HashMap::new();
    placeholders.insert(
        "a red fox".to_string(),
        "https://cdn.x.test/fox.png".to_string(),
    );
    let ephemerals = HashMap::new();

    let mut content = FetchedContent::default();
    content.images.insert(
        "https://cdn.x.test/fox.png".to_string(),
        "data:image/png;base64,FOX".to_string(),
    );

    // The page never got to swap the key for the resolved URL; the
    // snapshot performs the substitution statically.
    let doc = generate_html(
        r#"<html><body><img src="a red fox"></body></html>"#,
        BASE,
        &content,
        &placeholders,
        &ephemerals,
        &NoOpProgress,
    )
    .unwrap();

    assert!(doc.html.contains("data:image/png;base64,FOX"));
}
