//! Snapshot archive encoding
//!
//! The publish service accepts a compressed single-entry archive whose
//! entry is named `index.html`. Compression of a large snapshot can take
//! a while, so it runs on the blocking thread pool.

use std::io::Write;

use flate2::{Compression, GzBuilder};

use super::types::PublishError;

/// Archive entry name the publish service expects
pub const ARCHIVE_ENTRY_NAME: &str = "index.html";

/// Compress the snapshot markup into a single-entry gzip archive.
pub async fn build_archive(html: String) -> Result<Vec<u8>, PublishError> {
    let task = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, std::io::Error> {
        let mut gz = GzBuilder::new()
            .filename(ARCHIVE_ENTRY_NAME)
            .write(Vec::new(), Compression::new(6));
        gz.write_all(html.as_bytes())?;
        gz.finish()
    });

    match task.await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(PublishError::Archive(e.to_string())),
        Err(e) => Err(PublishError::Archive(format!("compression task panicked: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;

    #[tokio::test]
    async fn archive_decompresses_to_original_markup() {
        let html = "<!DOCTYPE html>\n<html><body>hello</body></html>".to_string();
        let archive = build_archive(html.clone()).await.unwrap();

        let mut decoder = GzDecoder::new(archive.as_slice());
        let mut decompressed = String::new();
        decoder.read_to_string(&mut decompressed).unwrap();
        assert_eq!(decompressed, html);

        let header = decoder.header().unwrap();
        assert_eq!(header.filename(), Some(ARCHIVE_ENTRY_NAME.as_bytes()));
    }
}
