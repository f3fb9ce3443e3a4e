//! End-to-end pipeline over already-captured markup: discovery, fetch,
//! and assembly against a mock origin, no browser involved.

use pagesnap::config::SnapshotConfigBuilder;
use pagesnap::progress::NoOpProgress;
use pagesnap::snapshot::{NoEphemeralCapture, SnapshotError, snapshot_page};

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0, 1, 2, 3];

#[tokio::test]
async fn snapshot_inlines_every_discovered_resource() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/style.css")
        .with_status(200)
        .with_header("content-type", "text/css")
        .with_body("body{background:url(bg.png)}")
        .create_async()
        .await;
    server
        .mock("GET", "/bg.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .create_async()
        .await;
    server
        .mock("GET", "/logo.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .create_async()
        .await;
    server
        .mock("GET", "/app.js")
        .with_status(200)
        .with_header("content-type", "text/javascript")
        .with_body("console.log('app');")
        .create_async()
        .await;

    let html = r#"<html><head>
        <title>Demo</title>
        <link rel="stylesheet" href="style.css">
        <script src="app.js"></script>
        </head><body>
        <img src="logo.png">
        </body></html>"#;

    let config = SnapshotConfigBuilder::new().build().unwrap();
    let base = format!("{}/", server.url());
    let doc = snapshot_page(html, &base, &config, &NoEphemeralCapture, &NoOpProgress)
        .await
        .unwrap();

    assert_eq!(doc.title, "Demo");
    assert!(doc.html.starts_with("<!DOCTYPE html>\n"));
    // Image inlined and marked
    assert!(doc.html.contains("data:image/png;base64,"));
    assert!(doc.html.contains(r#"data-downloaded="true""#));
    // Stylesheet inlined with its nested reference already rewritten
    assert!(!doc.html.contains("<link"));
    assert!(doc.html.contains("body{background:url(\"data:image/png;base64,"));
    // Script inlined
    assert!(doc.html.contains("console.log('app');"));
    assert!(!doc.html.contains("app.js"));
}

#[tokio::test]
async fn unreachable_resources_yield_a_partial_snapshot() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/logo.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .create_async()
        .await;
    server
        .mock("GET", "/style.css")
        .with_status(500)
        .create_async()
        .await;

    let html = r#"<html><head><title>Partial</title>
        <link rel="stylesheet" href="style.css">
        </head><body><img src="logo.png"></body></html>"#;

    let config = SnapshotConfigBuilder::new().build().unwrap();
    let base = format!("{}/", server.url());
    let doc = snapshot_page(html, &base, &config, &NoEphemeralCapture, &NoOpProgress)
        .await
        .unwrap();

    // Image made it in, the dead stylesheet link survives untouched
    assert!(doc.html.contains("data:image/png;base64,"));
    assert!(doc.html.contains(r#"href="style.css""#));
}

#[tokio::test]
async fn invalid_base_url_fails_the_collect_stage() {
    let config = SnapshotConfigBuilder::new().build().unwrap();
    let err = snapshot_page(
        "<html></html>",
        "::not-a-url::",
        &config,
        &NoEphemeralCapture,
        &NoOpProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SnapshotError::CollectError(_)));
}

#[tokio::test]
async fn page_without_resources_round_trips() {
    let config = SnapshotConfigBuilder::new().build().unwrap();
    let doc = snapshot_page(
        "<html><head><title>Plain</title></head><body><p>text</p></body></html>",
        "https://x.test/",
        &config,
        &NoEphemeralCapture,
        &NoOpProgress,
    )
    .await
    .unwrap();

    assert_eq!(doc.title, "Plain");
    assert!(doc.html.contains("<p>text</p>"));
}
