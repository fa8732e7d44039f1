//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a harvest run,
//! including totals, per-target outcomes and failed targets.

use crate::harvest::RunReport;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of `report` to `output_path`
pub fn write_markdown_report(output_path: &Path, report: &RunReport) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_markdown_report(report: &RunReport) -> String {
    let mut md = String::new();

    md.push_str("# Reel-Harvest Run Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    if let Some(started) = &report.started_at {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration() {
        let seconds = duration.num_seconds();
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            seconds,
            seconds as f64 / 60.0
        ));
    }
    md.push('\n');

    // Totals
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Targets**: {}\n", report.total_targets));
    md.push_str(&format!(
        "- **Succeeded**: {} ({} partial)\n",
        report.succeeded_targets, report.partial_targets
    ));
    md.push_str(&format!("- **Failed**: {}\n", report.failed_targets.len()));
    md.push_str(&format!(
        "- **Items Persisted**: {}\n",
        report.total_items_persisted
    ));
    md.push_str(&format!(
        "- **Items Skipped**: {}\n",
        report.total_items_skipped
    ));
    md.push_str(&format!(
        "- **Item Failures**: {}\n\n",
        report.item_failures
    ));

    // Per-target table
    if !report.runs.is_empty() {
        md.push_str("## Targets\n\n");
        md.push_str("| Target | Status | Scraped | Persisted | Skipped |\n");
        md.push_str("|--------|--------|---------|-----------|---------|\n");
        for run in &report.runs {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                run.target(),
                run.status().to_db_string(),
                run.items_scraped(),
                run.items_processed(),
                run.items_skipped()
            ));
        }
        md.push('\n');
    }

    if !report.failed_targets.is_empty() {
        md.push_str("## Failed Targets\n\n");
        md.push_str("| Target | Reason |\n");
        md.push_str("|--------|--------|\n");
        for failed in &report.failed_targets {
            md.push_str(&format!("| {} | {} |\n", failed.target, failed.reason));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::{FailureCollector, ResultAggregator};
    use crate::model::{PipelineRunBuilder, Target};
    use tempfile::TempDir;

    fn create_test_report() -> RunReport {
        let mut aggregator = ResultAggregator::new();
        let mut failures = FailureCollector::new();

        let mut ok = PipelineRunBuilder::start(Target::account("natgeo"));
        ok.set_scraped(3);
        aggregator.on_target_complete(&ok.finish(3));

        let failed = PipelineRunBuilder::start(Target::tag("viral")).fail("no_content_found");
        failures.record("#viral", "no_content_found");
        aggregator.on_target_complete(&failed);

        aggregator.finalize(&failures)
    }

    #[test]
    fn test_format_markdown_report() {
        let markdown = format_markdown_report(&create_test_report());

        assert!(markdown.contains("# Reel-Harvest Run Summary"));
        assert!(markdown.contains("- **Targets**: 2"));
        assert!(markdown.contains("- **Items Persisted**: 3"));
        assert!(markdown.contains("| @natgeo | success | 3 | 3 | 0 |"));
        assert!(markdown.contains("## Failed Targets"));
        assert!(markdown.contains("| #viral | no_content_found |"));
    }

    #[test]
    fn test_no_failed_section_when_all_succeed() {
        let report = ResultAggregator::new().finalize(&FailureCollector::new());
        let markdown = format_markdown_report(&report);
        assert!(!markdown.contains("Failed Targets"));
        assert!(!markdown.contains("## Targets"));
    }

    #[test]
    fn test_write_markdown_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");

        write_markdown_report(&path, &create_test_report()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Reel-Harvest Run Summary"));
    }
}
