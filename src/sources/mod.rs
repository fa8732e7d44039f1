//! External collaborators of the harvest pipeline
//!
//! The orchestrator only sees the traits defined here. Each submodule ships
//! one concrete adapter:
//! - `api`: REST scraping through an Apify actor
//! - `browser`: scraping through a WebDriver-controlled browser
//! - `enricher`: AI analysis through an OpenAI-compatible API
//! - `ytdlp`: media extraction through the `yt-dlp` binary

pub mod api;
pub mod browser;
pub mod enricher;
pub mod webdriver;
pub mod ytdlp;

pub use api::ApiScraper;
pub use browser::BrowserScraper;
pub use enricher::OpenAiEnricher;
pub use ytdlp::YtDlpExtractor;

use crate::model::{Analysis, RawContentItem, Target};
use crate::{EnrichError, ScrapeError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// User agent sent by every HTTP adapter
pub const USER_AGENT: &str = concat!("ReelHarvest/", env!("CARGO_PKG_VERSION"));

/// A scraping backend that turns a target into raw items
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Scrapes up to `max_items` items for one target
    async fn scrape(
        &self,
        target: &Target,
        max_items: usize,
    ) -> Result<Vec<RawContentItem>, ScrapeError>;

    /// Releases any session held by the backend
    ///
    /// Called once after the last target, whatever the outcome of the run.
    async fn release(&self) {}
}

/// Produces the analysis fields for one item
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn analyze(&self, item: &RawContentItem) -> Result<Analysis, EnrichError>;
}

/// One downloadable format reported by the extractor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaFormat {
    pub url: String,
    pub ext: Option<String>,
    /// Video height in pixels, when known
    pub quality_hint: Option<u32>,
    /// Size in bytes, when known
    pub size_hint: Option<u64>,
}

/// Extraction result for one media URL
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMedia {
    pub direct_url: Option<String>,
    pub formats: Vec<MediaFormat>,
}

/// Media extraction service
///
/// Implementations never fail: an extraction error yields an empty
/// `ExtractedMedia`.
#[async_trait]
pub trait CdnExtractor: Send + Sync {
    async fn info(&self, url: &str) -> ExtractedMedia;
}

/// Builds the HTTP client shared by the REST adapters
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Reads a required secret from the environment
pub(crate) fn require_env(name: &str) -> Result<String, crate::ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| crate::ConfigError::MissingEnv(name.to_string()))
}
