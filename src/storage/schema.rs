//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Reel-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Enriched reels, one row per reel id
CREATE TABLE IF NOT EXISTS reels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reel_id TEXT NOT NULL UNIQUE,
    reel_link TEXT NOT NULL,
    caption TEXT NOT NULL,
    creator_username TEXT NOT NULL,
    creator_profile TEXT NOT NULL,
    ai_summary TEXT NOT NULL,
    category TEXT NOT NULL,
    likes INTEGER NOT NULL DEFAULT 0,
    views INTEGER NOT NULL DEFAULT 0,
    sentiment TEXT NOT NULL,
    top_comment_summary TEXT NOT NULL,
    embeddings TEXT NOT NULL,
    top_comments TEXT NOT NULL,
    upload_date TEXT,
    cdn_link TEXT,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reels_creator ON reels(creator_username);
CREATE INDEX IF NOT EXISTS idx_reels_sentiment ON reels(sentiment);

-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    method TEXT NOT NULL,
    state TEXT NOT NULL,
    total_targets INTEGER NOT NULL DEFAULT 0,
    succeeded_targets INTEGER NOT NULL DEFAULT 0,
    failed_targets INTEGER NOT NULL DEFAULT 0,
    items_persisted INTEGER NOT NULL DEFAULT 0
);

-- Per-target outcomes within a run
CREATE TABLE IF NOT EXISTS run_targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    target TEXT NOT NULL,
    status TEXT NOT NULL,
    items_scraped INTEGER NOT NULL DEFAULT 0,
    items_persisted INTEGER NOT NULL DEFAULT 0,
    items_skipped INTEGER NOT NULL DEFAULT 0,
    failure_reason TEXT
);

CREATE INDEX IF NOT EXISTS idx_run_targets_run ON run_targets(run_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
