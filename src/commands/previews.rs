//! Image preview files
//!
//! The terminal cannot show pictures, so each rendered page writes its image
//! bytes next to each other in the preview directory, named after the row.
//! Files left over from an earlier render of the same row are removed first.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::application::enrichment::EnrichedRow;

/// File extension guessed from the leading bytes
pub fn sniff_extension(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "png",
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [b'G', b'I', b'F', b'8', ..] => "gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        [b'B', b'M', ..] => "bmp",
        [_, _, _, _, b'f', b't', b'y', b'p', b'a', b'v', b'i', b'f', ..] => "avif",
        _ if looks_like_svg(bytes) => "svg",
        _ => "bin",
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    head.contains("<svg")
}

/// Write the previews of `rows` into `dir`; returns the files written
pub async fn write_previews(dir: &Path, rows: &[EnrichedRow]) -> std::io::Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    remove_stale_previews(dir, rows).await?;
    let mut written = Vec::new();

    for row in rows {
        let sides = [
            ("primary", row.primary.bytes()),
            ("secondary", row.secondary.bytes()),
        ];
        for (side, bytes) in sides {
            let Some(bytes) = bytes else { continue };
            let path = dir.join(format!("{}_{}.{}", row.row_id, side, sniff_extension(bytes)));
            match tokio::fs::write(&path, bytes).await {
                Ok(()) => {
                    debug!("Preview written: {:?}", path);
                    written.push(path);
                }
                Err(e) => warn!("⚠️ Could not write preview {:?}: {}", path, e),
            }
        }
    }

    Ok(written)
}

/// Remove earlier preview files of `rows`, whatever their extension
async fn remove_stale_previews(dir: &Path, rows: &[EnrichedRow]) -> std::io::Result<()> {
    let prefixes: Vec<String> = rows
        .iter()
        .flat_map(|row| {
            ["primary", "secondary"].map(|side| format!("{}_{}.", row.row_id, side))
        })
        .collect();

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !prefixes.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            continue;
        }
        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Stale preview removed: {:?}", path),
            Err(e) => warn!("⚠️ Could not remove stale preview {:?}: {}", path, e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::enrichment::{PrimaryImage, SecondaryImage};
    use rstest::rstest;
    use serde_json::Map;
    use std::sync::Arc;

    #[rstest]
    #[case(b"\x89PNG\r\n\x1a\n....", "png")]
    #[case(b"\xFF\xD8\xFF\xE0", "jpg")]
    #[case(b"GIF89a", "gif")]
    #[case(b"RIFF\x00\x00\x00\x00WEBPVP8 ", "webp")]
    #[case(b"<?xml version=\"1.0\"?><svg xmlns=\"\">", "svg")]
    #[case(b"hello", "bin")]
    fn sniffs(#[case] bytes: &[u8], #[case] expected: &str) {
        assert_eq!(sniff_extension(bytes), expected);
    }

    #[tokio::test]
    async fn previews_are_named_after_rows() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![EnrichedRow {
            row_id: 7,
            primary: PrimaryImage::Ready {
                url: "https://cdn/7.png".into(),
                bytes: Arc::from(&b"\x89PNG...."[..]),
            },
            secondary: SecondaryImage::MissingUrl,
            details: Map::new(),
            matched: false,
        }];

        let written = write_previews(dir.path(), &rows).await.unwrap();
        assert_eq!(written, vec![dir.path().join("7_primary.png")]);
    }

    #[tokio::test]
    async fn rerender_removes_previews_that_are_no_longer_available() {
        let dir = tempfile::tempdir().unwrap();
        let ready = EnrichedRow {
            row_id: 7,
            primary: PrimaryImage::Ready {
                url: "https://cdn/7.png".into(),
                bytes: Arc::from(&b"\x89PNG...."[..]),
            },
            secondary: SecondaryImage::MissingUrl,
            details: Map::new(),
            matched: false,
        };
        write_previews(dir.path(), &[ready]).await.unwrap();
        std::fs::write(dir.path().join("8_primary.png"), b"other row").unwrap();
        std::fs::write(dir.path().join("70_primary.png"), b"other row").unwrap();

        let failed = EnrichedRow {
            row_id: 7,
            primary: PrimaryImage::NotDownloadable {
                url: "https://cdn/7.png".into(),
            },
            secondary: SecondaryImage::MissingUrl,
            details: Map::new(),
            matched: false,
        };
        let written = write_previews(dir.path(), &[failed]).await.unwrap();

        assert!(written.is_empty());
        assert!(!dir.path().join("7_primary.png").exists());
        assert!(dir.path().join("8_primary.png").exists());
        assert!(dir.path().join("70_primary.png").exists());
    }
}
