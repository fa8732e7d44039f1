//! Bulk ingestion orchestration
//!
//! This module contains the harvest core, including:
//! - The ordered target queue and the pacer between targets
//! - The per-target scrape/enrich/resolve/persist pipeline
//! - CDN link resolution through a fallback chain
//! - Failure collection and the final run report

mod cdn;
mod coordinator;
mod failures;
mod pacer;
mod pipeline;
mod queue;
mod report;

pub use cdn::CdnResolver;
pub use coordinator::{HarvestOptions, HarvestOutput, Harvester, CANCELLED};
pub use failures::{FailureCollector, FailureEntry, FailureScope};
pub use pacer::{Pacer, SleepPacer};
pub use pipeline::PipelineRunner;
pub use queue::TargetQueue;
pub use report::{FailedTarget, ResultAggregator, RunReport};

use crate::config::{parse_targets, Config, RunConfig, ScrapeMethod};
use crate::sources::{
    ApiScraper, BrowserScraper, CdnExtractor, OpenAiEnricher, Scraper, YtDlpExtractor,
};
use crate::storage::SqliteStore;
use crate::{output, ConfigError, Result};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Runs a complete harvest from a validated configuration
///
/// This is the main entry point. It will:
/// 1. Open the store and record a new run
/// 2. Build the enricher, the extractor, and the scraper
/// 3. Work the target queue
/// 4. Download reel videos when a download directory is configured
/// 5. Record per-target outcomes, close the run, and write the JSON
///    artifact and markdown summary when configured
///
/// Only setup failures are returned as errors; failed targets end up in
/// the report, and problems in step 5 are logged.
pub async fn run_harvest(config: &Config, config_hash: &str) -> Result<RunReport> {
    run_harvest_until(config, config_hash, std::future::pending::<()>()).await
}

/// Like [`run_harvest`], stopping early when `shutdown` completes
///
/// Targets not finished at shutdown are reported as failed with reason
/// `cancelled`. The scraper is released before this returns.
pub async fn run_harvest_until<F>(
    config: &Config,
    config_hash: &str,
    shutdown: F,
) -> Result<RunReport>
where
    F: Future<Output = ()>,
{
    let targets = parse_targets(&config.targets)?;
    let run_config = &config.run;

    let store = SqliteStore::new(Path::new(&config.storage.database_path))?;
    let enricher = OpenAiEnricher::new(&config.enricher)?;
    let extractor = YtDlpExtractor::new(&config.extractor);
    let pacer = SleepPacer::from_secs(run_config.inter_target_delay_seconds);

    let scraper: Arc<dyn Scraper> = match run_config.method {
        ScrapeMethod::Api => {
            if run_config.use_login {
                tracing::warn!("use-login only applies to the browser method, ignoring");
            }
            let api = config.api.as_ref().ok_or_else(|| {
                ConfigError::Validation("method \"api\" requires an [api] section".to_string())
            })?;
            Arc::new(ApiScraper::new(api)?)
        }
        ScrapeMethod::Browser => {
            let browser = config.browser.as_ref().ok_or_else(|| {
                ConfigError::Validation(
                    "method \"browser\" requires a [browser] section".to_string(),
                )
            })?;
            Arc::new(BrowserScraper::connect(browser, run_config.use_login).await?)
        }
    };

    let run_id = match store.create_run(config_hash, run_config.method.as_str()) {
        Ok(id) => id,
        Err(e) => {
            scraper.release().await;
            return Err(e.into());
        }
    };

    let options = HarvestOptions {
        max_items_per_target: run_config.max_items_per_target as usize,
        dedupe_before_insert: run_config.dedupe_before_insert,
        cdn_host_marker: config.extractor.cdn_host_marker.clone(),
    };

    let mut harvester = Harvester::new(scraper, &enricher, &store, &pacer, options);
    if run_config.resolve_cdn {
        harvester = harvester.with_extractor(&extractor as &dyn CdnExtractor);
    }
    let output = harvester
        .run_until(TargetQueue::new(targets), shutdown)
        .await;

    if extractor.download_dir().is_some() && !output.items.is_empty() {
        extractor.download_batch(&output.items).await;
    }

    close_run(&store, run_id, run_config, &output);
    Ok(output.report)
}

/// Records the run outcome and writes the configured artifacts
///
/// Everything harvested is already persisted by now, so failures here are
/// logged and never turn the run into an error.
fn close_run(
    store: &SqliteStore,
    run_id: i64,
    run_config: &RunConfig,
    output: &HarvestOutput,
) {
    let HarvestOutput { report, items } = output;

    for run in &report.runs {
        if let Err(e) = store.record_target(run_id, run) {
            tracing::warn!(source = %run.target(), error = %e, "Failed to record target outcome");
        }
    }
    if let Err(e) = store.complete_run(run_id, report) {
        tracing::error!(run_id, error = %e, "Failed to close run record");
    }

    if let Some(path) = &run_config.output_path {
        match output::write_items_json(Path::new(path), items) {
            Ok(()) => tracing::info!(path = %path, count = items.len(), "Wrote items"),
            Err(e) => tracing::error!(path = %path, error = %e, "Failed to write items"),
        }
    }

    if let Some(path) = &run_config.summary_path {
        match output::write_markdown_report(Path::new(path), report) {
            Ok(()) => tracing::info!(path = %path, "Wrote run summary"),
            Err(e) => tracing::error!(path = %path, error = %e, "Failed to write run summary"),
        }
    }
}
