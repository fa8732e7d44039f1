//! Storage module for persisting harvested reels
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Batch persistence of enriched reels with per-row confirmation
//! - Existence checks used by the deduplication guard
//! - Run and per-target bookkeeping for later statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{PersistenceStore, StoreError, StoreResult};

/// Result of one `save_batch` call
///
/// `succeeded == total` only when every row was individually confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub total: usize,
    /// Ids of the rows that could not be written
    pub failed_ids: Vec<String>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }
}

/// A reel read back from the store
#[derive(Debug, Clone)]
pub struct ReelRecord {
    pub id: i64,
    pub reel_id: String,
    pub reel_link: String,
    pub caption: String,
    pub creator_username: String,
    pub creator_profile: String,
    pub ai_summary: String,
    pub categories: Vec<String>,
    pub likes: u64,
    pub views: u64,
    pub sentiment: String,
    pub top_comment_summary: String,
    pub cdn_link: Option<String>,
    pub scraped_at: String,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub method: String,
    pub state: RunState,
    pub total_targets: u64,
    pub succeeded_targets: u64,
    pub failed_targets: u64,
    pub items_persisted: u64,
}

/// Lifecycle of a run row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Completed,
}

impl RunState {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}
