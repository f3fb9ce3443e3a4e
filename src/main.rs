// pagesnap CLI: snapshot a URL into a single self-contained HTML file,
// optionally publishing the result.

use anyhow::{Context, Result, bail};
use pagesnap::{
    LogProgress, PublishClient, SnapshotConfigBuilder, filename_from_title, snapshot_url,
};

struct Args {
    url: String,
    output: Option<String>,
    publish: bool,
    headless: bool,
}

fn print_usage() {
    eprintln!("Usage: pagesnap <url> [--output FILE] [--publish] [--no-headless]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --output FILE   Write the snapshot to FILE (default: derived from page title)");
    eprintln!("  --publish       Upload the snapshot to the publishing service");
    eprintln!("                  (requires PAGESNAP_ENDPOINT and PAGESNAP_API_KEY)");
    eprintln!("  --no-headless   Show the browser window during capture");
}

fn parse_args() -> Result<Args> {
    let mut url = None;
    let mut output = None;
    let mut publish = false;
    let mut headless = true;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" => {
                output = Some(args.next().context("--output requires a file path")?);
            }
            "--publish" => publish = true,
            "--no-headless" => headless = false,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown option: {other}"),
            other => {
                if url.is_some() {
                    bail!("unexpected extra argument: {other}");
                }
                url = Some(other.to_string());
            }
        }
    }

    let Some(url) = url else {
        print_usage();
        bail!("missing required <url> argument");
    };
    Ok(Args {
        url,
        output,
        publish,
        headless,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;

    let config = SnapshotConfigBuilder::new()
        .headless(args.headless)
        .publish_from_env()
        .build()?;

    let document = snapshot_url(&args.url, &config, &LogProgress)
        .await
        .with_context(|| format!("Failed to snapshot {}", args.url))?;

    let output_path = args
        .output
        .unwrap_or_else(|| filename_from_title(&document.title, "html"));
    tokio::fs::write(&output_path, &document.html)
        .await
        .with_context(|| format!("Failed to write {output_path}"))?;
    log::info!("Saved snapshot to {output_path}");

    if args.publish {
        let client = PublishClient::from_config(&config)?;
        let published = client
            .publish(document.html.clone(), &document.title, &LogProgress)
            .await?;
        println!("{}", published.view_url);
    }

    Ok(())
}
