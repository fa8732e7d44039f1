//! Media extraction and download with yt-dlp
//!
//! `info` backs CDN resolution and never fails. `download` and
//! `download_batch` save reel videos under the configured download directory,
//! one file per reel named after its id.

use crate::config::ExtractorConfig;
use crate::model::EnrichedItem;
use crate::sources::{CdnExtractor, ExtractedMedia, MediaFormat};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Subset of `yt-dlp --dump-json` output
#[derive(Debug, Deserialize)]
struct DumpJson {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    formats: Vec<DumpFormat>,
}

#[derive(Debug, Deserialize)]
struct DumpFormat {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    filesize: Option<u64>,
}

/// Runs `yt-dlp` for each lookup or download
pub struct YtDlpExtractor {
    binary: String,
    download_dir: Option<PathBuf>,
}

impl YtDlpExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            download_dir: config.download_dir.as_ref().map(PathBuf::from),
        }
    }

    /// Directory downloads are written to, if configured
    pub fn download_dir(&self) -> Option<&Path> {
        self.download_dir.as_deref()
    }

    /// Downloads the best single-file format of `url` as `<dir>/<reel_id>.<ext>`
    ///
    /// # Arguments
    ///
    /// * `url` - Reel page URL or direct CDN link
    /// * `reel_id` - File stem for the downloaded video
    ///
    /// # Returns
    ///
    /// The path yt-dlp reports for the finished file.
    pub async fn download(&self, url: &str, reel_id: &str) -> Result<PathBuf> {
        let dir = self
            .download_dir
            .as_deref()
            .context("No download directory configured")?;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let template = dir.join(format!("{}.%(ext)s", reel_id));
        let output = Command::new(&self.binary)
            .args(["-f", "best", "--no-playlist", "--quiet", "--no-warnings"])
            .args(["--no-simulate", "--print", "after_move:filepath", "-o"])
            .arg(&template)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute yt-dlp")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp download failed: {}", stderr.trim());
        }

        downloaded_path(&output.stdout).context("yt-dlp did not report a downloaded file")
    }

    /// Downloads every item with a link, keyed by reel id
    ///
    /// Failures are logged and left out of the map.
    pub async fn download_batch(&self, items: &[EnrichedItem]) -> HashMap<String, PathBuf> {
        let mut downloads = HashMap::new();

        for item in items {
            if item.reel_link.is_empty() {
                tracing::warn!(reel_id = %item.reel_id, "No video link, skipping download");
                continue;
            }

            match self.download(&item.reel_link, &item.reel_id).await {
                Ok(path) => {
                    tracing::debug!(reel_id = %item.reel_id, path = %path.display(), "Downloaded video");
                    downloads.insert(item.reel_id.clone(), path);
                }
                Err(e) => {
                    tracing::warn!(reel_id = %item.reel_id, error = %e, "Download failed");
                }
            }
        }

        tracing::info!(
            total = items.len(),
            downloaded = downloads.len(),
            failed = items.len() - downloads.len(),
            "Downloads complete"
        );
        downloads
    }

    async fn dump(&self, url: &str) -> Result<ExtractedMedia> {
        let output = Command::new(&self.binary)
            .args(["--dump-json", "--no-playlist", "--quiet", "--no-warnings"])
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute yt-dlp")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", stderr.trim());
        }

        parse_dump(&output.stdout)
    }
}

#[async_trait]
impl CdnExtractor for YtDlpExtractor {
    async fn info(&self, url: &str) -> ExtractedMedia {
        match self.dump(url).await {
            Ok(media) => media,
            Err(e) => {
                tracing::debug!(url, error = %e, "Extraction failed");
                ExtractedMedia::default()
            }
        }
    }
}

/// Last non-empty line of yt-dlp's `--print` output
fn downloaded_path(stdout: &[u8]) -> Option<PathBuf> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(PathBuf::from)
}

/// Converts yt-dlp JSON into an `ExtractedMedia`, dropping formats without a URL
fn parse_dump(stdout: &[u8]) -> Result<ExtractedMedia> {
    let dump: DumpJson =
        serde_json::from_slice(stdout).context("Failed to parse yt-dlp JSON output")?;

    let formats = dump
        .formats
        .into_iter()
        .filter_map(|f| {
            Some(MediaFormat {
                url: f.url.filter(|u| !u.is_empty())?,
                ext: f.ext,
                quality_hint: f.height,
                size_hint: f.filesize,
            })
        })
        .collect();

    Ok(ExtractedMedia {
        direct_url: dump.url.filter(|u| !u.is_empty()),
        formats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dump() {
        let json = br#"{
            "id": "Cx1",
            "url": "https://scontent.cdninstagram.com/direct.mp4",
            "formats": [
                {"format_id": "dash-1", "url": "https://scontent.cdninstagram.com/a.mp4", "ext": "mp4", "height": 720, "filesize": 1024},
                {"format_id": "dash-2", "ext": "m4a"},
                {"format_id": "dash-3", "url": "https://other.example/b.mp4", "height": null}
            ]
        }"#;

        let media = parse_dump(json).unwrap();
        assert_eq!(
            media.direct_url.as_deref(),
            Some("https://scontent.cdninstagram.com/direct.mp4")
        );
        assert_eq!(media.formats.len(), 2);
        assert_eq!(media.formats[0].quality_hint, Some(720));
        assert_eq!(media.formats[0].size_hint, Some(1024));
        assert_eq!(media.formats[1].quality_hint, None);
    }

    #[test]
    fn test_parse_dump_empty_url_is_none() {
        let media = parse_dump(br#"{"url": "", "formats": []}"#).unwrap();
        assert_eq!(media, ExtractedMedia::default());
    }

    #[test]
    fn test_parse_dump_rejects_garbage() {
        assert!(parse_dump(b"ERROR: unsupported URL").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_yields_empty_media() {
        let extractor = YtDlpExtractor {
            binary: "reel-harvest-no-such-binary".to_string(),
            download_dir: None,
        };
        let media = extractor.info("https://www.instagram.com/reel/Cx1/").await;
        assert_eq!(media, ExtractedMedia::default());
    }

    #[test]
    fn test_downloaded_path_takes_last_line() {
        assert_eq!(
            downloaded_path(b"[info] noise\n/tmp/v/Cx1.mp4\n\n"),
            Some(PathBuf::from("/tmp/v/Cx1.mp4"))
        );
        assert_eq!(downloaded_path(b"  \n"), None);
    }

    fn item(id: &str, link: &str) -> EnrichedItem {
        let raw = crate::model::RawContentItem {
            id: id.to_string(),
            link: link.to_string(),
            caption: String::new(),
            creator: crate::model::Creator::default(),
            like_count: 0,
            view_count: 0,
            top_comments: vec![],
            upload_date: None,
        };
        EnrichedItem::new(raw, crate::model::Analysis::default(), None)
    }

    #[tokio::test]
    async fn test_download_requires_directory() {
        let extractor = YtDlpExtractor::new(&ExtractorConfig::default());
        let err = extractor
            .download("https://www.instagram.com/reel/Cx1/", "Cx1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No download directory"));
    }

    #[tokio::test]
    async fn test_batch_with_missing_binary_downloads_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let extractor = YtDlpExtractor {
            binary: "reel-harvest-no-such-binary".to_string(),
            download_dir: Some(dir.path().to_path_buf()),
        };

        let downloads = extractor
            .download_batch(&[item("Cx1", "https://www.instagram.com/reel/Cx1/")])
            .await;
        assert!(downloads.is_empty());
    }

    /// Stand-in for yt-dlp that creates the `-o` target and prints its path
    #[cfg(unix)]
    fn fake_ytdlp(dir: &Path) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-yt-dlp");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             while [ $# -gt 0 ]; do\n\
               if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi\n\
               shift\n\
             done\n\
             out=$(printf '%s' \"$out\" | sed 's/%(ext)s/mp4/')\n\
             : > \"$out\"\n\
             echo \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.display().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_batch_names_files_by_reel_id() {
        let bin = tempfile::TempDir::new().unwrap();
        let out = tempfile::TempDir::new().unwrap();
        let extractor = YtDlpExtractor {
            binary: fake_ytdlp(bin.path()),
            download_dir: Some(out.path().join("videos")),
        };

        let downloads = extractor
            .download_batch(&[
                item("Cx1", "https://www.instagram.com/reel/Cx1/"),
                item("Dy2", ""),
                item("Ez3", "https://www.instagram.com/reel/Ez3/"),
            ])
            .await;

        assert_eq!(downloads.len(), 2);
        let first = &downloads["Cx1"];
        assert_eq!(first, &out.path().join("videos").join("Cx1.mp4"));
        assert!(first.exists());
        assert!(downloads["Ez3"].ends_with("Ez3.mp4"));
        assert!(!downloads.contains_key("Dy2"));
    }
}
