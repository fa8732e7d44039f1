//! Output module for run artifacts and reports
//!
//! This module handles:
//! - Writing the enriched items as a JSON artifact
//! - Generating markdown summaries of a harvest run
//! - Printing run reports and store statistics to the terminal

mod json;
mod markdown;
pub mod stats;

pub use json::write_items_json;
pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::harvest::RunReport;
use crate::model::RunStatus;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Prints the end-of-run summary to stdout
pub fn print_report(report: &RunReport) {
    println!("\n{}", "=".repeat(60));
    println!("HARVEST COMPLETE");
    println!("{}", "=".repeat(60));
    println!("Items persisted: {}", report.total_items_persisted);
    println!("Items skipped: {}", report.total_items_skipped);
    println!(
        "Successful targets: {}/{} ({} partial)",
        report.succeeded_targets, report.total_targets, report.partial_targets
    );
    if let Some(duration) = report.duration() {
        println!("Duration: {}s", duration.num_seconds());
    }

    let partial: Vec<_> = report
        .runs
        .iter()
        .filter(|r| r.status() == RunStatus::Partial)
        .collect();
    if !partial.is_empty() {
        println!("\nPartial targets ({}):", partial.len());
        for run in partial {
            println!(
                "  - {} ({}/{} persisted)",
                run.target(),
                run.items_processed(),
                run.items_scraped()
            );
        }
    }

    if !report.failed_targets.is_empty() {
        println!("\nFailed targets ({}):", report.failed_targets.len());
        for failed in &report.failed_targets {
            println!("  - {}: {}", failed.target, failed.reason);
        }
    }
    println!("{}", "=".repeat(60));
}
