//! Storage traits and error types
//!
//! `PersistenceStore` is the narrow contract the harvest pipeline depends on.
//! Run bookkeeping and statistics live on the concrete `SqliteStore`.

use crate::model::EnrichedItem;
use crate::storage::BatchOutcome;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Reel not found: {0}")]
    ReelNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract used by the pipeline
pub trait PersistenceStore {
    /// Writes every item, one row at a time
    ///
    /// The call is not transactional: rows that fail are reported in the
    /// outcome and the remaining rows are still attempted. An `Err` means the
    /// batch could not be attempted at all.
    fn save_batch(&self, items: &[EnrichedItem]) -> StoreResult<BatchOutcome>;

    /// Returns true if a reel with this id is already stored
    fn exists(&self, reel_id: &str) -> StoreResult<bool>;
}
