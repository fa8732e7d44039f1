//! REST scraping backend backed by an Apify actor
//!
//! Each target is scraped with one synchronous actor run
//! (`run-sync-get-dataset-items`), so no polling is needed.

use crate::config::ApiConfig;
use crate::model::{Comment, Creator, RawContentItem, Target, TargetKind};
use crate::sources::{build_http_client, require_env, Scraper};
use crate::{HarvestError, ScrapeError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SITE_URL: &str = "https://www.instagram.com";

/// Comments kept per reel
const TOP_COMMENTS: usize = 5;

/// Actor input; exactly one of the source lists is set
#[derive(Debug, Serialize, Default)]
struct ActorInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hashtags: Option<Vec<String>>,
    #[serde(rename = "directUrls", skip_serializing_if = "Option::is_none")]
    direct_urls: Option<Vec<String>>,
    #[serde(rename = "resultsLimit")]
    results_limit: usize,
}

impl ActorInput {
    fn for_target(target: &Target, limit: usize) -> Self {
        let source = vec![target.identifier().to_string()];
        let mut input = Self {
            results_limit: limit,
            ..Self::default()
        };
        match target.kind() {
            TargetKind::Account => input.username = Some(source),
            TargetKind::Tag => input.hashtags = Some(source),
            TargetKind::Url => input.direct_urls = Some(source),
        }
        input
    }
}

/// One reel from the actor's dataset
#[derive(Debug, Deserialize)]
struct DatasetItem {
    #[serde(rename = "shortCode")]
    short_code: Option<String>,
    url: Option<String>,
    caption: Option<String>,
    #[serde(rename = "ownerUsername")]
    owner_username: Option<String>,
    #[serde(rename = "likesCount")]
    likes_count: Option<i64>,
    #[serde(rename = "videoPlayCount")]
    video_play_count: Option<i64>,
    #[serde(rename = "videoViewCount")]
    video_view_count: Option<i64>,
    #[serde(rename = "latestComments", default)]
    latest_comments: Vec<DatasetComment>,
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatasetComment {
    #[serde(rename = "ownerUsername")]
    owner_username: Option<String>,
    text: Option<String>,
    timestamp: Option<String>,
}

impl DatasetItem {
    fn into_raw(self) -> Option<RawContentItem> {
        let id = self
            .short_code
            .filter(|c| !c.is_empty())
            .or_else(|| self.url.as_deref().and_then(shortcode_from_url))?;
        let link = self
            .url
            .unwrap_or_else(|| format!("{}/reel/{}/", SITE_URL, id));
        let username = self.owner_username.unwrap_or_default();

        let top_comments = self
            .latest_comments
            .into_iter()
            .filter_map(|c| {
                Some(Comment {
                    user: c.owner_username.unwrap_or_default(),
                    comment: c.text.filter(|t| !t.is_empty())?,
                    timestamp: c.timestamp,
                })
            })
            .take(TOP_COMMENTS)
            .collect();

        Some(RawContentItem {
            id,
            link,
            caption: self.caption.unwrap_or_default(),
            creator: Creator::from_username(SITE_URL, &username),
            like_count: non_negative(self.likes_count),
            view_count: non_negative(self.video_play_count.or(self.video_view_count)),
            top_comments,
            upload_date: self.timestamp,
        })
    }
}

/// Extracts the shortcode from a `/reel/{code}/` or `/p/{code}/` URL
pub(crate) fn shortcode_from_url(link: &str) -> Option<String> {
    let url = url::Url::parse(link).ok()?;
    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if matches!(segment, "reel" | "reels" | "p") {
            return segments
                .next()
                .filter(|code| !code.is_empty())
                .map(str::to_string);
        }
    }
    None
}

fn non_negative(value: Option<i64>) -> u64 {
    value.unwrap_or(0).max(0) as u64
}

/// Scraper calling an Apify actor synchronously
pub struct ApiScraper {
    client: Client,
    base_url: String,
    actor: String,
    token: String,
}

impl ApiScraper {
    /// Builds the scraper, reading the API token from the configured variable
    pub fn new(config: &ApiConfig) -> Result<Self, HarvestError> {
        let token = require_env(&config.token_env)?;
        Self::with_token(config, token)
    }

    pub fn with_token(config: &ApiConfig, token: String) -> Result<Self, HarvestError> {
        let client = build_http_client(Duration::from_secs(config.timeout_seconds))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            actor: config.actor.clone(),
            token,
        })
    }

    async fn run_actor(&self, input: &ActorInput) -> Result<Vec<DatasetItem>, HarvestError> {
        let url = format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.base_url, self.actor
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HarvestError::Api {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        Ok(resp.json::<Vec<DatasetItem>>().await?)
    }
}

#[async_trait]
impl Scraper for ApiScraper {
    async fn scrape(
        &self,
        target: &Target,
        max_items: usize,
    ) -> Result<Vec<RawContentItem>, ScrapeError> {
        tracing::info!(source = %target, max_items, actor = %self.actor, "Starting actor run");

        let input = ActorInput::for_target(target, max_items);
        let dataset = self
            .run_actor(&input)
            .await
            .map_err(|e| ScrapeError::new(target.to_string(), e))?;

        let fetched = dataset.len();
        let items: Vec<RawContentItem> = dataset
            .into_iter()
            .filter_map(DatasetItem::into_raw)
            .take(max_items)
            .collect();

        tracing::info!(source = %target, fetched, kept = items.len(), "Actor run complete");
        Ok(items)
    }
}
