//! Content items as they move through the pipeline
//!
//! A `RawContentItem` is produced by a scraper, combined with one `Analysis`
//! into an `EnrichedItem`, and flattened into a `PersistedRecord` at save time.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Creator of a reel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub username: String,
    pub profile: String,
}

impl Creator {
    /// Builds a creator with a profile URL derived from the site base
    pub fn from_username(site_url: &str, username: &str) -> Self {
        Self {
            username: username.to_string(),
            profile: format!("{}/{}/", site_url.trim_end_matches('/'), username),
        }
    }
}

/// One top-level comment on a reel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub user: String,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// One scraped reel before enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct RawContentItem {
    /// Shortcode, unique within a target's result set
    pub id: String,
    pub link: String,
    pub caption: String,
    pub creator: Creator,
    pub like_count: u64,
    pub view_count: u64,
    /// Comments in the order the scraper ranked them
    pub top_comments: Vec<Comment>,
    pub upload_date: Option<String>,
}

impl RawContentItem {
    /// Canonical reel URL handed to the CDN extractor
    pub fn canonical_url(&self) -> String {
        format!("https://www.instagram.com/reel/{}/", self.id)
    }
}

/// Derived fields returned by the enricher for one item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub ai_summary: String,
    pub categories: Vec<String>,
    pub sentiment: String,
    pub top_comment_summary: String,
    pub embedding: Vec<f32>,
}

/// A reel combined with its analysis
///
/// Serializes to the JSON artifact shape written to `output-path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub reel_id: String,
    #[serde(rename = "Reel_link")]
    pub reel_link: String,
    pub caption: String,
    pub creator: Creator,
    pub ai_summary: String,
    pub category: Vec<String>,
    pub likes: u64,
    pub views: u64,
    pub sentiment: String,
    pub top_comment_summary: String,
    pub embeddings: Vec<f32>,
    pub top_comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn_link: Option<String>,
}

impl EnrichedItem {
    /// Combines one raw item with its analysis
    ///
    /// An empty CDN link is treated the same as no link.
    pub fn new(raw: RawContentItem, analysis: Analysis, cdn_link: Option<String>) -> Self {
        Self {
            reel_id: raw.id,
            reel_link: raw.link,
            caption: raw.caption,
            creator: raw.creator,
            ai_summary: analysis.ai_summary,
            category: analysis.categories,
            likes: raw.like_count,
            views: raw.view_count,
            sentiment: analysis.sentiment,
            top_comment_summary: analysis.top_comment_summary,
            embeddings: analysis.embedding,
            top_comments: raw.top_comments,
            upload_date: raw.upload_date,
            cdn_link: cdn_link.filter(|link| !link.is_empty()),
        }
    }
}

/// Flattened row shape written by the store
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
    pub reel_id: String,
    pub reel_link: String,
    pub caption: String,
    pub creator_username: String,
    pub creator_profile: String,
    pub ai_summary: String,
    /// JSON-encoded list of categories
    pub category: String,
    pub likes: u64,
    pub views: u64,
    pub sentiment: String,
    pub top_comment_summary: String,
    /// JSON-encoded embedding vector
    pub embeddings: String,
    /// JSON-encoded list of comments
    pub top_comments: String,
    pub upload_date: Option<String>,
    pub cdn_link: Option<String>,
    pub scraped_at: String,
}

impl PersistedRecord {
    /// Flattens an enriched item, stamping it with the persistence time
    pub fn from_item(
        item: &EnrichedItem,
        scraped_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            reel_id: item.reel_id.clone(),
            reel_link: item.reel_link.clone(),
            caption: item.caption.clone(),
            creator_username: item.creator.username.clone(),
            creator_profile: item.creator.profile.clone(),
            ai_summary: item.ai_summary.clone(),
            category: serde_json::to_string(&item.category)?,
            likes: item.likes,
            views: item.views,
            sentiment: item.sentiment.clone(),
            top_comment_summary: item.top_comment_summary.clone(),
            embeddings: serde_json::to_string(&item.embeddings)?,
            top_comments: serde_json::to_string(&item.top_comments)?,
            upload_date: item.upload_date.clone(),
            cdn_link: item.cdn_link.clone(),
            scraped_at: scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}
