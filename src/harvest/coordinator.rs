//! Harvest coordinator - main run loop
//!
//! The coordinator walks the target queue one target at a time, pacing
//! between targets, and hands the scraper back once the queue is drained.

use crate::harvest::cdn::CdnResolver;
use crate::harvest::failures::FailureCollector;
use crate::harvest::pacer::Pacer;
use crate::harvest::pipeline::PipelineRunner;
use crate::harvest::queue::TargetQueue;
use crate::harvest::report::{ResultAggregator, RunReport};
use crate::model::{EnrichedItem, PipelineRunBuilder, Target};
use crate::sources::{CdnExtractor, Enricher, Scraper};
use crate::storage::PersistenceStore;
use std::future::Future;
use std::sync::Arc;

/// Failure reason for targets that never ran to completion
pub const CANCELLED: &str = "cancelled";

/// Per-run knobs for the coordinator
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub max_items_per_target: usize,
    pub dedupe_before_insert: bool,
    pub cdn_host_marker: String,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            max_items_per_target: 5,
            dedupe_before_insert: true,
            cdn_host_marker: crate::config::DEFAULT_CDN_HOST_MARKER.to_string(),
        }
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct HarvestOutput {
    pub report: RunReport,
    /// Enriched items in the order they were produced
    pub items: Vec<EnrichedItem>,
}

/// Hands the scraper back exactly once
///
/// `finish` releases in-line. If the guard is dropped first, which happens
/// when the run future is cancelled, the release is spawned on the current
/// runtime instead.
struct ReleaseGuard {
    scraper: Option<Arc<dyn Scraper>>,
}

impl ReleaseGuard {
    fn new(scraper: Arc<dyn Scraper>) -> Self {
        Self {
            scraper: Some(scraper),
        }
    }

    async fn finish(mut self) {
        if let Some(scraper) = self.scraper.take() {
            scraper.release().await;
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let Some(scraper) = self.scraper.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!("Harvest interrupted, releasing scraper in the background");
                handle.spawn(async move { scraper.release().await });
            }
            Err(_) => tracing::error!("Harvest interrupted outside a runtime, scraper not released"),
        }
    }
}

/// Main harvest coordinator
pub struct Harvester<'a> {
    scraper: Arc<dyn Scraper>,
    enricher: &'a dyn Enricher,
    store: &'a dyn PersistenceStore,
    pacer: &'a dyn Pacer,
    extractor: Option<&'a dyn CdnExtractor>,
    options: HarvestOptions,
}

impl<'a> Harvester<'a> {
    /// Creates a coordinator around the run's collaborators
    ///
    /// The scraper is shared so that it can still be released after the
    /// run future has been dropped.
    pub fn new(
        scraper: Arc<dyn Scraper>,
        enricher: &'a dyn Enricher,
        store: &'a dyn PersistenceStore,
        pacer: &'a dyn Pacer,
        options: HarvestOptions,
    ) -> Self {
        Self {
            scraper,
            enricher,
            store,
            pacer,
            extractor: None,
            options,
        }
    }

    /// Resolves a CDN link for every item through `extractor`
    pub fn with_extractor(mut self, extractor: &'a dyn CdnExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Runs every target in the queue
    ///
    /// Target failures are recorded and the queue moves on; this never
    /// returns early. The scraper is released after the last target.
    pub async fn run(&self, queue: TargetQueue) -> HarvestOutput {
        self.run_until(queue, std::future::pending::<()>()).await
    }

    /// Runs the queue until it is drained or `shutdown` completes
    ///
    /// On shutdown the target in progress and every target still queued are
    /// recorded as failed with reason `cancelled`, the scraper is released,
    /// and the report covers the whole queue.
    pub async fn run_until<F>(&self, mut queue: TargetQueue, shutdown: F) -> HarvestOutput
    where
        F: Future<Output = ()>,
    {
        let guard = ReleaseGuard::new(Arc::clone(&self.scraper));
        tokio::pin!(shutdown);

        let mut runner = PipelineRunner::new(self.scraper.as_ref(), self.enricher, self.store)
            .dedupe_before_insert(self.options.dedupe_before_insert);
        if let Some(extractor) = self.extractor {
            runner =
                runner.with_resolver(CdnResolver::new(extractor, &self.options.cdn_host_marker));
        }

        let mut failures = FailureCollector::new();
        let mut aggregator = ResultAggregator::new();
        let mut items = Vec::new();

        tracing::info!(
            targets = queue.len_total(),
            max_items = self.options.max_items_per_target,
            "Starting harvest"
        );

        while let Some(target) = queue.next() {
            tracing::info!(
                "[{}/{}] Processing {}",
                queue.position(),
                queue.len_total(),
                target
            );

            // Work on one target, unless a shutdown arrives first
            let run = tokio::select! {
                run = runner.run_collecting(
                    &target,
                    self.options.max_items_per_target,
                    &mut failures,
                    &mut items,
                ) => run,
                _ = &mut shutdown => {
                    tracing::warn!(source = %target, "Shutdown requested, stopping harvest");
                    cancel_remaining(target, &mut queue, &mut failures, &mut aggregator);
                    break;
                }
            };

            if run.status().is_failure() {
                failures.record(
                    target.to_string(),
                    run.failure_reason().unwrap_or("unknown"),
                );
            }
            aggregator.on_target_complete(&run);

            // Pace before the next target; a shutdown cuts the wait short
            if !queue.is_empty() {
                tokio::select! {
                    _ = self.pacer.wait_between_targets() => {}
                    _ = &mut shutdown => {
                        tracing::warn!("Shutdown requested, stopping harvest");
                        if let Some(next) = queue.next() {
                            cancel_remaining(next, &mut queue, &mut failures, &mut aggregator);
                        }
                        break;
                    }
                }
            }
        }

        guard.finish().await;

        let report = aggregator.finalize(&failures);
        tracing::info!(
            succeeded = report.succeeded_targets,
            failed = report.failed_targets.len(),
            persisted = report.total_items_persisted,
            "Harvest complete"
        );

        HarvestOutput { report, items }
    }
}

/// Records `current` and everything left in the queue as cancelled
fn cancel_remaining(
    current: Target,
    queue: &mut TargetQueue,
    failures: &mut FailureCollector,
    aggregator: &mut ResultAggregator,
) {
    let mut next = Some(current);
    while let Some(target) = next {
        failures.record(target.to_string(), CANCELLED);
        aggregator.on_target_complete(&PipelineRunBuilder::start(target).fail(CANCELLED));
        next = queue.next();
    }
}
