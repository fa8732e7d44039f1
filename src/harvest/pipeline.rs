//! Per-target pipeline: scrape, enrich, resolve, persist
//!
//! Item-level problems (a failed enrichment, a duplicate, a row the store
//! rejects) never fail the target. The target only fails when the scrape
//! fails or comes back empty, when nothing reaches the store, or when the
//! batch write itself errors.

use crate::harvest::cdn::CdnResolver;
use crate::harvest::failures::FailureCollector;
use crate::model::{EnrichedItem, PipelineRun, PipelineRunBuilder, Target, NO_CONTENT_FOUND};
use crate::sources::{Enricher, Scraper};
use crate::storage::{PersistenceStore, StoreError};
use crate::ScrapeError;
use std::collections::HashSet;
use thiserror::Error;

/// Reason recorded for rows the store did not accept
const PERSIST_FAILED: &str = "persist_failed";

/// Why a whole target failed; the display text becomes the run's failure reason
#[derive(Debug, Error)]
enum TargetFailure {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("{}", NO_CONTENT_FOUND)]
    NoContent,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs the per-target stages against borrowed collaborators
///
/// One runner serves a whole harvest; it holds no per-target state.
pub struct PipelineRunner<'a> {
    scraper: &'a dyn Scraper,
    enricher: &'a dyn Enricher,
    store: &'a dyn PersistenceStore,
    resolver: Option<CdnResolver<'a>>,
    dedupe_before_insert: bool,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        scraper: &'a dyn Scraper,
        enricher: &'a dyn Enricher,
        store: &'a dyn PersistenceStore,
    ) -> Self {
        Self {
            scraper,
            enricher,
            store,
            resolver: None,
            dedupe_before_insert: true,
        }
    }

    /// Enables CDN resolution for every enriched item
    pub fn with_resolver(mut self, resolver: CdnResolver<'a>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Controls whether the store is consulted for existing ids before enrichment
    pub fn dedupe_before_insert(mut self, enabled: bool) -> Self {
        self.dedupe_before_insert = enabled;
        self
    }

    /// Processes one target end to end
    pub async fn run(
        &self,
        target: &Target,
        max_items: usize,
        failures: &mut FailureCollector,
    ) -> PipelineRun {
        let mut discarded = Vec::new();
        self.run_collecting(target, max_items, failures, &mut discarded)
            .await
    }

    /// Processes one target, appending every enriched item to `sink`
    pub async fn run_collecting(
        &self,
        target: &Target,
        max_items: usize,
        failures: &mut FailureCollector,
        sink: &mut Vec<EnrichedItem>,
    ) -> PipelineRun {
        let mut builder = PipelineRunBuilder::start(target.clone());

        let run = match self
            .process(&mut builder, max_items, failures, sink)
            .await
        {
            Ok(persisted) => builder.finish(persisted),
            Err(failure) => builder.fail(failure.to_string()),
        };

        tracing::info!(
            source = %target,
            status = run.status().to_db_string(),
            scraped = run.items_scraped(),
            persisted = run.items_processed(),
            skipped = run.items_skipped(),
            "Target finished"
        );
        run
    }

    /// Runs the stages for the target held by `builder`
    ///
    /// # Arguments
    ///
    /// * `builder` - Run record for the target; counters are updated in place
    /// * `max_items` - Upper bound handed to the scraper
    /// * `failures` - Collects item-scope failures
    /// * `sink` - Receives every enriched item handed to the store
    ///
    /// # Returns
    ///
    /// The number of store-confirmed rows, or why the target failed
    async fn process(
        &self,
        builder: &mut PipelineRunBuilder,
        max_items: usize,
        failures: &mut FailureCollector,
        sink: &mut Vec<EnrichedItem>,
    ) -> Result<usize, TargetFailure> {
        let target = builder.target().clone();
        let label = target.to_string();

        // Step 1: scrape
        let items = self.scraper.scrape(&target, max_items).await?;
        builder.set_scraped(items.len());

        if items.is_empty() {
            tracing::warn!(source = %label, "No content found");
            return Err(TargetFailure::NoContent);
        }
        tracing::info!(source = %label, count = items.len(), "Scraped items");

        let mut seen = HashSet::new();
        let mut enriched = Vec::with_capacity(items.len());

        for raw in items {
            // Step 2: drop ids repeated within this result set
            if !seen.insert(raw.id.clone()) {
                tracing::warn!(source = %label, item_id = %raw.id, "Repeated id in result set, skipping");
                builder.record_skip();
                continue;
            }

            // Step 3: skip reels already stored, before paying for enrichment
            if self.dedupe_before_insert {
                match self.store.exists(&raw.id) {
                    Ok(true) => {
                        tracing::info!(source = %label, item_id = %raw.id, "Already stored, skipping");
                        builder.record_duplicate();
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(item_id = %raw.id, error = %e, "Existence check failed");
                    }
                }
            }

            // Step 4: enrich; a failure costs only this item
            let analysis = match self.enricher.analyze(&raw).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    tracing::warn!(source = %label, item_id = %raw.id, error = %e.cause, "Enrichment failed, skipping item");
                    failures.record_item(label.as_str(), raw.id.as_str(), e.cause);
                    builder.record_skip();
                    continue;
                }
            };

            // Step 5: resolve a CDN link when enabled
            let cdn_link = match &self.resolver {
                Some(resolver) => resolver.resolve(&raw.canonical_url()).await,
                None => None,
            };

            enriched.push(EnrichedItem::new(raw, analysis, cdn_link));
        }

        if enriched.is_empty() {
            return Ok(0);
        }

        // Step 6: persist as one batch
        let saved = self.store.save_batch(&enriched);
        sink.extend(enriched);
        let outcome = saved?;

        for id in &outcome.failed_ids {
            failures.record_item(label.as_str(), id.as_str(), PERSIST_FAILED);
        }

        Ok(outcome.succeeded)
    }
}
