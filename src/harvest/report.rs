//! Run totals and the final report

use crate::harvest::failures::FailureCollector;
use crate::model::{PipelineRun, RunStatus};
use chrono::{DateTime, Utc};

/// A target that ended in failure, with its reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTarget {
    pub target: String,
    pub reason: String,
}

/// Summary of a whole harvest run
///
/// `succeeded_targets` includes partial targets, so
/// `succeeded_targets + failed_targets.len() == total_targets` always holds.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub total_targets: usize,
    pub succeeded_targets: usize,
    pub partial_targets: usize,
    pub failed_targets: Vec<FailedTarget>,
    pub total_items_persisted: usize,
    pub total_items_skipped: usize,
    pub item_failures: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub runs: Vec<PipelineRun>,
}

impl RunReport {
    /// Wall-clock duration of the run, when both ends are known
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    pub fn is_consistent(&self) -> bool {
        self.succeeded_targets + self.failed_targets.len() == self.total_targets
    }
}

/// Accumulates per-target outcomes as the queue is worked
#[derive(Debug)]
pub struct ResultAggregator {
    started_at: DateTime<Utc>,
    runs: Vec<PipelineRun>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            runs: Vec::new(),
        }
    }

    pub fn on_target_complete(&mut self, run: &PipelineRun) {
        self.runs.push(run.clone());
    }

    pub fn completed(&self) -> usize {
        self.runs.len()
    }

    /// Items persisted so far across all targets
    pub fn items_persisted(&self) -> usize {
        self.runs.iter().map(PipelineRun::items_processed).sum()
    }

    /// Builds the final report
    ///
    /// Failed targets are listed in the order their failures were recorded.
    pub fn finalize(self, failures: &FailureCollector) -> RunReport {
        let total_targets = self.runs.len();
        let partial_targets = self
            .runs
            .iter()
            .filter(|r| r.status() == RunStatus::Partial)
            .count();
        let succeeded_targets = self
            .runs
            .iter()
            .filter(|r| !r.status().is_failure())
            .count();

        let failed_targets = failures
            .target_failures()
            .map(|e| FailedTarget {
                target: e.target.clone(),
                reason: e.reason.clone(),
            })
            .collect();

        RunReport {
            total_targets,
            succeeded_targets,
            partial_targets,
            failed_targets,
            total_items_persisted: self.items_persisted(),
            total_items_skipped: self.runs.iter().map(PipelineRun::items_skipped).sum(),
            item_failures: failures.item_failure_count(),
            started_at: Some(self.started_at),
            finished_at: Some(Utc::now()),
            runs: self.runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PipelineRunBuilder, Target};

    fn finished(name: &str, scraped: usize, persisted: usize) -> PipelineRun {
        let mut b = PipelineRunBuilder::start(Target::account(name));
        b.set_scraped(scraped);
        b.finish(persisted)
    }

    #[test]
    fn test_finalize_counts_and_invariant() {
        let mut aggregator = ResultAggregator::new();
        let mut failures = FailureCollector::new();

        aggregator.on_target_complete(&finished("a", 2, 2));
        aggregator.on_target_complete(&finished("b", 3, 1));

        let failed = PipelineRunBuilder::start(Target::tag("c")).fail("no_content_found");
        failures.record("#c", "no_content_found");
        aggregator.on_target_complete(&failed);

        let report = aggregator.finalize(&failures);

        assert_eq!(report.total_targets, 3);
        assert_eq!(report.succeeded_targets, 2);
        assert_eq!(report.partial_targets, 1);
        assert_eq!(
            report.failed_targets,
            vec![FailedTarget {
                target: "#c".to_string(),
                reason: "no_content_found".to_string()
            }]
        );
        assert_eq!(report.total_items_persisted, 3);
        assert_eq!(report.total_items_skipped, 2);
        assert!(report.is_consistent());
        assert!(report.duration().is_some());
    }

    #[test]
    fn test_empty_run() {
        let report = ResultAggregator::new().finalize(&FailureCollector::new());
        assert_eq!(report.total_targets, 0);
        assert!(report.is_consistent());
    }
}
