//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of `PersistenceStore`
//! plus the run bookkeeping and statistics queries used by the CLI.

use crate::harvest::RunReport;
use crate::model::{EnrichedItem, PersistedRecord, PipelineRun};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PersistenceStore, StoreError, StoreResult};
use crate::storage::{BatchOutcome, ReelRecord, RunRecord, RunState};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const REEL_COLUMNS: &str = "id, reel_id, reel_link, caption, creator_username, creator_profile,
     ai_summary, category, likes, views, sentiment, top_comment_summary, cdn_link, scraped_at";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, method, state,
     total_targets, succeeded_targets, failed_targets, items_persisted";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// Foreign keys are switched on and the schema is applied before the
    /// store is handed back.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the SQLite file; created if missing
    ///
    /// # Returns
    ///
    /// A ready-to-use store, or the error from opening or migrating it
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Reels =====

    /// Inserts a single reel, stamping `scraped_at` with the current time
    ///
    /// # Arguments
    ///
    /// * `item` - The enriched reel to store
    ///
    /// # Returns
    ///
    /// The new row id; a reel id that is already stored is a constraint error
    pub fn save_reel(&self, item: &EnrichedItem) -> StoreResult<i64> {
        let record = PersistedRecord::from_item(item, Utc::now())?;
        self.conn.execute(
            "INSERT INTO reels (reel_id, reel_link, caption, creator_username, creator_profile,
             ai_summary, category, likes, views, sentiment, top_comment_summary, embeddings,
             top_comments, upload_date, cdn_link, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                record.reel_id,
                record.reel_link,
                record.caption,
                record.creator_username,
                record.creator_profile,
                record.ai_summary,
                record.category,
                record.likes as i64,
                record.views as i64,
                record.sentiment,
                record.top_comment_summary,
                record.embeddings,
                record.top_comments,
                record.upload_date,
                record.cdn_link,
                record.scraped_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Looks up a reel by its platform id
    ///
    /// # Returns
    ///
    /// `None` when no reel with `reel_id` is stored
    pub fn get_reel(&self, reel_id: &str) -> StoreResult<Option<ReelRecord>> {
        let sql = format!("SELECT {} FROM reels WHERE reel_id = ?1", REEL_COLUMNS);
        let reel = self
            .conn
            .query_row(&sql, params![reel_id], reel_from_row)
            .optional()?;
        Ok(reel)
    }

    /// Lists the most recently stored reels
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of rows, newest insert first
    pub fn list_reels(&self, limit: usize) -> StoreResult<Vec<ReelRecord>> {
        let sql = format!(
            "SELECT {} FROM reels ORDER BY id DESC LIMIT ?1",
            REEL_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let reels = stmt
            .query_map(params![limit as i64], reel_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reels)
    }

    /// Deletes a reel, returning whether a row was removed
    pub fn delete_reel(&self, reel_id: &str) -> StoreResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM reels WHERE reel_id = ?1", params![reel_id])?;
        Ok(removed > 0)
    }

    // ===== Run Management =====

    /// Opens a run row in the `running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the effective configuration
    /// * `method` - Scraping method label, `api` or `browser`
    ///
    /// # Returns
    ///
    /// The id later passed to [`record_target`](Self::record_target) and
    /// [`complete_run`](Self::complete_run)
    pub fn create_run(&self, config_hash: &str, method: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, method, state) VALUES (?1, ?2, ?3, ?4)",
            params![now, config_hash, method, RunState::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Records the outcome of one target within a run
    ///
    /// # Arguments
    ///
    /// * `run_id` - A run opened with [`create_run`](Self::create_run)
    /// * `run` - The finished per-target run
    ///
    /// # Returns
    ///
    /// A constraint error if `run_id` does not name a stored run
    pub fn record_target(&self, run_id: i64, run: &PipelineRun) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO run_targets
             (run_id, target, status, items_scraped, items_persisted, items_skipped, failure_reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                run.target().to_string(),
                run.status().to_db_string(),
                run.items_scraped() as i64,
                run.items_processed() as i64,
                run.items_skipped() as i64,
                run.failure_reason(),
            ],
        )?;
        Ok(())
    }

    /// Marks a run as completed with the final report totals
    ///
    /// # Arguments
    ///
    /// * `run_id` - A run opened with [`create_run`](Self::create_run)
    /// * `report` - Totals copied onto the run row
    ///
    /// # Returns
    ///
    /// [`StoreError::RunNotFound`] when no row was updated
    pub fn complete_run(&self, run_id: i64, report: &RunReport) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET state = ?1, finished_at = ?2, total_targets = ?3,
             succeeded_targets = ?4, failed_targets = ?5, items_persisted = ?6 WHERE id = ?7",
            params![
                RunState::Completed.to_db_string(),
                now,
                report.total_targets as i64,
                report.succeeded_targets as i64,
                report.failed_targets.len() as i64,
                report.total_items_persisted as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Loads a run row by id
    pub fn get_run(&self, run_id: i64) -> StoreResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StoreError::RunNotFound(run_id))
    }

    pub fn recent_runs(&self, limit: usize) -> StoreResult<Vec<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT ?1", RUN_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// Targets that failed in a given run, with their reasons
    pub fn failed_targets(&self, run_id: i64) -> StoreResult<Vec<(String, Option<String>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT target, failure_reason FROM run_targets
             WHERE run_id = ?1 AND status = 'failed' ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Statistics =====

    pub fn count_reels(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reels", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_creators(&self) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT creator_username) FROM reels",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Reel counts per sentiment label, most common first
    pub fn sentiment_breakdown(&self) -> StoreResult<Vec<(String, u64)>> {
        self.grouped_counts(
            "SELECT sentiment, COUNT(*) AS n FROM reels GROUP BY sentiment ORDER BY n DESC, sentiment",
            None,
        )
    }

    /// Creators with the most stored reels
    pub fn top_creators(&self, limit: usize) -> StoreResult<Vec<(String, u64)>> {
        self.grouped_counts(
            "SELECT creator_username, COUNT(*) AS n FROM reels
             GROUP BY creator_username ORDER BY n DESC, creator_username LIMIT ?1",
            Some(limit),
        )
    }

    fn grouped_counts(&self, sql: &str, limit: Option<usize>) -> StoreResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(sql)?;
        let map = |row: &Row<'_>| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64));
        let rows = match limit {
            Some(limit) => stmt
                .query_map(params![limit as i64], map)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }
}

impl PersistenceStore for SqliteStore {
    fn save_batch(&self, items: &[EnrichedItem]) -> StoreResult<BatchOutcome> {
        let mut outcome = BatchOutcome {
            succeeded: 0,
            total: items.len(),
            failed_ids: Vec::new(),
        };

        for item in items {
            match self.save_reel(item) {
                Ok(_) => {
                    tracing::debug!(reel_id = %item.reel_id, "Saved reel");
                    outcome.succeeded += 1;
                }
                Err(e) => {
                    tracing::warn!(reel_id = %item.reel_id, error = %e, "Failed to save reel");
                    outcome.failed_ids.push(item.reel_id.clone());
                }
            }
        }

        tracing::info!(
            total = outcome.total,
            saved = outcome.succeeded,
            failed = outcome.total - outcome.succeeded,
            "Batch persisted"
        );

        Ok(outcome)
    }

    fn exists(&self, reel_id: &str) -> StoreResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM reels WHERE reel_id = ?1",
                params![reel_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn reel_from_row(row: &Row<'_>) -> rusqlite::Result<ReelRecord> {
    let category: String = row.get(7)?;
    Ok(ReelRecord {
        id: row.get(0)?,
        reel_id: row.get(1)?,
        reel_link: row.get(2)?,
        caption: row.get(3)?,
        creator_username: row.get(4)?,
        creator_profile: row.get(5)?,
        ai_summary: row.get(6)?,
        categories: serde_json::from_str(&category).unwrap_or_default(),
        likes: row.get::<_, i64>(8)? as u64,
        views: row.get::<_, i64>(9)? as u64,
        sentiment: row.get(10)?,
        top_comment_summary: row.get(11)?,
        cdn_link: row.get(12)?,
        scraped_at: row.get(13)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        method: row.get(4)?,
        state: RunState::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunState::Running),
        total_targets: row.get::<_, i64>(6)? as u64,
        succeeded_targets: row.get::<_, i64>(7)? as u64,
        failed_targets: row.get::<_, i64>(8)? as u64,
        items_persisted: row.get::<_, i64>(9)? as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Analysis, Creator, PipelineRunBuilder, RawContentItem, Target};

    fn item(id: &str, creator: &str, sentiment: &str) -> EnrichedItem {
        let raw = RawContentItem {
            id: id.to_string(),
            link: format!("https://www.instagram.com/reel/{}/", id),
            caption: "caption".to_string(),
            creator: Creator::from_username("https://www.instagram.com", creator),
            like_count: 10,
            view_count: 100,
            top_comments: vec![],
            upload_date: None,
        };
        let analysis = Analysis {
            ai_summary: "summary".to_string(),
            categories: vec!["Comedy".to_string()],
            sentiment: sentiment.to_string(),
            top_comment_summary: String::new(),
            embedding: vec![0.5],
        };
        EnrichedItem::new(raw, analysis, None)
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStore::in_memory().is_ok());
    }

    #[test]
    fn test_save_batch_all_succeed() {
        let store = SqliteStore::in_memory().unwrap();
        let outcome = store
            .save_batch(&[item("a", "nasa", "Positive"), item("b", "nasa", "Neutral")])
            .unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.total, 2);
        assert!(outcome.is_complete());
        assert_eq!(store.count_reels().unwrap(), 2);
    }

    #[test]
    fn test_save_batch_duplicate_is_partial() {
        let store = SqliteStore::in_memory().unwrap();
        store.save_batch(&[item("a", "nasa", "Positive")]).unwrap();

        let outcome = store
            .save_batch(&[item("a", "nasa", "Positive"), item("b", "nasa", "Positive")])
            .unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.failed_ids, vec!["a".to_string()]);
        assert_eq!(store.count_reels().unwrap(), 2);
    }

    #[test]
    fn test_exists() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(!store.exists("a").unwrap());
        store.save_reel(&item("a", "nasa", "Positive")).unwrap();
        assert!(store.exists("a").unwrap());
    }

    #[test]
    fn test_get_list_and_delete_reel() {
        let store = SqliteStore::in_memory().unwrap();
        store.save_reel(&item("a", "nasa", "Positive")).unwrap();
        store.save_reel(&item("b", "natgeo", "Negative")).unwrap();

        let reel = store.get_reel("a").unwrap().unwrap();
        assert_eq!(reel.creator_username, "nasa");
        assert_eq!(reel.categories, vec!["Comedy".to_string()]);
        assert_eq!(reel.likes, 10);

        let listed = store.list_reels(10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].reel_id, "b");

        assert!(store.delete_reel("a").unwrap());
        assert!(!store.delete_reel("a").unwrap());
        assert!(store.get_reel("a").unwrap().is_none());
    }

    #[test]
    fn test_statistics_queries() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save_batch(&[
                item("a", "nasa", "Positive"),
                item("b", "nasa", "Positive"),
                item("c", "natgeo", "Negative"),
            ])
            .unwrap();

        assert_eq!(store.count_creators().unwrap(), 2);
        assert_eq!(
            store.sentiment_breakdown().unwrap(),
            vec![("Positive".to_string(), 2), ("Negative".to_string(), 1)]
        );
        assert_eq!(store.top_creators(1).unwrap(), vec![("nasa".to_string(), 2)]);
    }

    #[test]
    fn test_run_bookkeeping() {
        let store = SqliteStore::in_memory().unwrap();
        let run_id = store.create_run("hash", "api").unwrap();

        let failed = PipelineRunBuilder::start(Target::tag("viral")).fail("no_content_found");
        store.record_target(run_id, &failed).unwrap();

        let report = RunReport {
            total_targets: 1,
            failed_targets: vec![crate::harvest::FailedTarget {
                target: "#viral".to_string(),
                reason: "no_content_found".to_string(),
            }],
            ..RunReport::default()
        };
        store.complete_run(run_id, &report).unwrap();

        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.failed_targets, 1);
        assert_eq!(run.method, "api");

        let failures = store.failed_targets(run_id).unwrap();
        assert_eq!(
            failures,
            vec![("#viral".to_string(), Some("no_content_found".to_string()))]
        );

        assert!(matches!(
            store.complete_run(999, &report),
            Err(StoreError::RunNotFound(999))
        ));
    }
}
