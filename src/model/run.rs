//! Per-target run outcome
//!
//! A run starts as a `PipelineRunBuilder` that only counts. Calling `finish`
//! or `fail` consumes the builder, so a `PipelineRun` always carries exactly
//! one terminal status.

use crate::model::Target;

/// Failure reason used when a scrape returns no items
pub const NO_CONTENT_FOUND: &str = "no_content_found";

const NO_ITEMS_PERSISTED: &str = "no_items_persisted";

/// Terminal status of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    /// Every scraped item was persisted
    Success,
    /// Some items persisted or were already stored, others were skipped
    Partial,
    /// Nothing was persisted
    Failed,
}

impl RunStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Counters for a target that is still being processed
#[derive(Debug)]
pub struct PipelineRunBuilder {
    target: Target,
    items_scraped: usize,
    items_skipped: usize,
    items_deduplicated: usize,
}

impl PipelineRunBuilder {
    pub fn start(target: Target) -> Self {
        Self {
            target,
            items_scraped: 0,
            items_skipped: 0,
            items_deduplicated: 0,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn set_scraped(&mut self, count: usize) {
        self.items_scraped = count;
    }

    /// Counts an item dropped before persistence (enrichment failure, repeat id)
    pub fn record_skip(&mut self) {
        self.items_skipped += 1;
    }

    /// Counts an item skipped because the store already holds it
    pub fn record_duplicate(&mut self) {
        self.items_skipped += 1;
        self.items_deduplicated += 1;
    }

    /// Finalizes the run from the number of store-confirmed rows
    ///
    /// Rows that failed to persist are counted as skipped.
    pub fn finish(self, persisted: usize) -> PipelineRun {
        let unaccounted = self
            .items_scraped
            .saturating_sub(persisted + self.items_skipped);
        let items_skipped = self.items_skipped + unaccounted;

        let (status, failure_reason) = if self.items_scraped > 0 && persisted == self.items_scraped
        {
            (RunStatus::Success, None)
        } else if persisted > 0 || self.items_deduplicated > 0 {
            (RunStatus::Partial, None)
        } else {
            (RunStatus::Failed, Some(NO_ITEMS_PERSISTED.to_string()))
        };

        PipelineRun {
            target: self.target,
            status,
            items_scraped: self.items_scraped,
            items_processed: persisted,
            items_skipped,
            failure_reason,
        }
    }

    /// Finalizes the run as failed before anything was persisted
    pub fn fail(self, reason: impl Into<String>) -> PipelineRun {
        PipelineRun {
            target: self.target,
            status: RunStatus::Failed,
            items_scraped: self.items_scraped,
            items_processed: 0,
            items_skipped: self.items_skipped,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Outcome of processing one target
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    target: Target,
    status: RunStatus,
    items_scraped: usize,
    items_processed: usize,
    items_skipped: usize,
    failure_reason: Option<String>,
}

impl PipelineRun {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn items_scraped(&self) -> usize {
        self.items_scraped
    }

    /// Items confirmed persisted by the store
    pub fn items_processed(&self) -> usize {
        self.items_processed
    }

    pub fn items_skipped(&self) -> usize {
        self.items_skipped
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}
