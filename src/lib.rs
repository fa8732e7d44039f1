//! Reel-Harvest: a paced bulk ingester for short-form video content
//!
//! This crate walks a queue of accounts, tags and reel URLs, scrapes each one,
//! enriches every item with AI-derived fields, and persists the results while
//! reporting per-target success and failure.

pub mod config;
pub mod harvest;
pub mod model;
pub mod output;
pub mod sources;
pub mod storage;

use thiserror::Error;

/// Main error type for Reel-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Enrich(#[from] EnrichError),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid target '{0}'")]
    InvalidTarget(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing environment variable {0}")]
    MissingEnv(String),
}

/// A scrape call failed for a whole target
#[derive(Debug, Error)]
#[error("scrape failed for {target}: {cause}")]
pub struct ScrapeError {
    pub target: String,
    pub cause: String,
}

impl ScrapeError {
    pub fn new(target: impl Into<String>, cause: impl ToString) -> Self {
        Self {
            target: target.into(),
            cause: cause.to_string(),
        }
    }
}

/// Enrichment failed for a single item
#[derive(Debug, Error)]
#[error("enrichment failed for item {item_id}: {cause}")]
pub struct EnrichError {
    pub item_id: String,
    pub cause: String,
}

impl EnrichError {
    pub fn new(item_id: impl Into<String>, cause: impl ToString) -> Self {
        Self {
            item_id: item_id.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for Reel-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{run_harvest, Harvester, RunReport};
pub use model::{EnrichedItem, PipelineRun, RawContentItem, RunStatus, Target, TargetKind};
