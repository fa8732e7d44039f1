//! Statistics generation from the reel database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{RunRecord, SqliteStore, StoreResult};

const TOP_CREATORS: usize = 10;
const RECENT_RUNS: usize = 5;

/// Harvest statistics summary
#[derive(Debug, Clone, Default)]
pub struct HarvestStatistics {
    /// Total number of reels stored
    pub total_reels: u64,

    /// Number of distinct creators
    pub unique_creators: u64,

    /// Reel counts per sentiment label, most common first
    pub sentiment_breakdown: Vec<(String, u64)>,

    /// Creators with the most stored reels
    pub top_creators: Vec<(String, u64)>,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from the store
pub fn load_statistics(store: &SqliteStore) -> StoreResult<HarvestStatistics> {
    Ok(HarvestStatistics {
        total_reels: store.count_reels()?,
        unique_creators: store.count_creators()?,
        sentiment_breakdown: store.sentiment_breakdown()?,
        top_creators: store.top_creators(TOP_CREATORS)?,
        recent_runs: store.recent_runs(RECENT_RUNS)?,
    })
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total reels: {}", stats.total_reels);
    println!("  Unique creators: {}", stats.unique_creators);
    println!();

    if !stats.sentiment_breakdown.is_empty() {
        println!("Reels by Sentiment:");
        for (sentiment, count) in &stats.sentiment_breakdown {
            let label = if sentiment.is_empty() {
                "(none)"
            } else {
                sentiment.as_str()
            };
            println!(
                "  {}: {} ({:.1}%)",
                label,
                count,
                percentage(*count, stats.total_reels)
            );
        }
        println!();
    }

    if !stats.top_creators.is_empty() {
        println!("Top Creators:");
        for (creator, count) in &stats.top_creators {
            println!("  @{}: {}", creator, count);
        }
        println!();
    }

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.recent_runs {
            println!(
                "  #{} {} [{}] {}: {}/{} targets ok, {} items",
                run.id,
                run.started_at,
                run.method,
                run.state.to_db_string(),
                run.succeeded_targets,
                run.total_targets,
                run.items_persisted
            );
        }
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Analysis, Creator, EnrichedItem, RawContentItem};
    use crate::storage::PersistenceStore;

    fn item(id: &str, creator: &str, sentiment: &str) -> EnrichedItem {
        let raw = RawContentItem {
            id: id.to_string(),
            link: format!("https://www.instagram.com/reel/{}/", id),
            caption: String::new(),
            creator: Creator::from_username("https://www.instagram.com", creator),
            like_count: 0,
            view_count: 0,
            top_comments: vec![],
            upload_date: None,
        };
        let analysis = Analysis {
            sentiment: sentiment.to_string(),
            ..Analysis::default()
        };
        EnrichedItem::new(raw, analysis, None)
    }

    #[test]
    fn test_load_statistics() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save_batch(&[
                item("a", "nasa", "Positive"),
                item("b", "nasa", "Neutral"),
                item("c", "9gag", "Positive"),
            ])
            .unwrap();
        store.create_run("hash", "api").unwrap();

        let stats = load_statistics(&store).unwrap();

        assert_eq!(stats.total_reels, 3);
        assert_eq!(stats.unique_creators, 2);
        assert_eq!(stats.sentiment_breakdown[0], ("Positive".to_string(), 2));
        assert_eq!(stats.top_creators[0], ("nasa".to_string(), 2));
        assert_eq!(stats.recent_runs.len(), 1);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(3, 0), 0.0);
    }
}
