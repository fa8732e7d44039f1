//! Integration tests for the harvester
//!
//! The orchestration tests drive `Harvester` with in-process fakes and a real
//! in-memory SQLite store. The end-to-end test runs `run_harvest` against
//! wiremock servers standing in for the scraping actor and the AI endpoint.

use async_trait::async_trait;
use reel_harvest::config::parse_config;
use reel_harvest::harvest::{HarvestOptions, Harvester, Pacer, TargetQueue, CANCELLED};
use reel_harvest::model::{Analysis, Creator, EnrichedItem, RawContentItem, RunStatus, Target};
use reel_harvest::sources::{Enricher, Scraper};
use reel_harvest::storage::SqliteStore;
use reel_harvest::{run_harvest, EnrichError, ScrapeError};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn raw(id: &str, creator: &str) -> RawContentItem {
    RawContentItem {
        id: id.to_string(),
        link: format!("https://www.instagram.com/reel/{}/", id),
        caption: format!("caption for {}", id),
        creator: Creator::from_username("https://www.instagram.com", creator),
        like_count: 7,
        view_count: 70,
        top_comments: vec![],
        upload_date: None,
    }
}

/// Serves canned items per account handle and counts releases
#[derive(Default)]
struct ScriptedScraper {
    items: HashMap<String, Vec<&'static str>>,
    broken: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
    releases: AtomicUsize,
}

impl ScriptedScraper {
    fn with(mut self, handle: &str, ids: Vec<&'static str>) -> Self {
        self.items.insert(handle.to_string(), ids);
        self
    }
}

#[async_trait]
impl Scraper for ScriptedScraper {
    async fn scrape(
        &self,
        target: &Target,
        max_items: usize,
    ) -> Result<Vec<RawContentItem>, ScrapeError> {
        let handle = target.identifier().to_string();
        self.calls.lock().unwrap().push(handle.clone());

        if self.broken.contains(&handle.as_str()) {
            return Err(ScrapeError::new(target.to_string(), "login wall"));
        }
        Ok(self
            .items
            .get(&handle)
            .map(|ids| {
                ids.iter()
                    .take(max_items)
                    .map(|id| raw(id, &handle))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fails enrichment for the listed ids
#[derive(Default)]
struct FakeEnricher {
    fail: Vec<&'static str>,
}

#[async_trait]
impl Enricher for FakeEnricher {
    async fn analyze(&self, item: &RawContentItem) -> Result<Analysis, EnrichError> {
        if self.fail.contains(&item.id.as_str()) {
            return Err(EnrichError::new(&item.id, "quota exceeded"));
        }
        Ok(Analysis {
            ai_summary: format!("summary of {}", item.id),
            categories: vec!["Test".to_string()],
            sentiment: "Neutral".to_string(),
            top_comment_summary: String::new(),
            embedding: vec![0.1, 0.2],
        })
    }
}

#[derive(Default)]
struct CountingPacer {
    waits: AtomicUsize,
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn wait_between_targets(&self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Never finishes its wait within a test
struct StalledPacer;

#[async_trait]
impl Pacer for StalledPacer {
    async fn wait_between_targets(&self) {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}

fn queue(handles: &[&str]) -> TargetQueue {
    TargetQueue::new(handles.iter().map(|h| Target::account(*h)).collect())
}

#[tokio::test]
async fn test_failed_target_does_not_stop_the_queue() {
    let scraper = Arc::new(
        ScriptedScraper::default()
            .with("a", vec!["a1"])
            .with("c", vec!["c1"]),
    );
    let enricher = FakeEnricher::default();
    let store = SqliteStore::in_memory().unwrap();
    let pacer = CountingPacer::default();

    let output = Harvester::new(
        scraper.clone(),
        &enricher,
        &store,
        &pacer,
        HarvestOptions::default(),
    )
    .run(queue(&["a", "b", "c"]))
    .await;
    let report = output.report;

    assert_eq!(
        *scraper.calls.lock().unwrap(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert_eq!(report.total_targets, 3);
    assert_eq!(report.succeeded_targets, 2);
    assert_eq!(report.total_items_persisted, 2);
    assert_eq!(report.failed_targets.len(), 1);
    assert_eq!(report.failed_targets[0].target, "@b");
    assert_eq!(report.failed_targets[0].reason, "no_content_found");
    assert!(report.is_consistent());
    assert_eq!(store.count_reels().unwrap(), 2);
}

#[tokio::test]
async fn test_scrape_error_is_reported_with_cause() {
    let scraper = Arc::new(
        ScriptedScraper {
            broken: vec!["private"],
            ..ScriptedScraper::default()
        }
        .with("open", vec!["o1"]),
    );
    let enricher = FakeEnricher::default();
    let store = SqliteStore::in_memory().unwrap();
    let pacer = CountingPacer::default();

    let report = Harvester::new(
        scraper.clone(),
        &enricher,
        &store,
        &pacer,
        HarvestOptions::default(),
    )
    .run(queue(&["private", "open"]))
    .await
    .report;

    assert_eq!(report.failed_targets.len(), 1);
    assert!(report.failed_targets[0].reason.contains("login wall"));
    assert_eq!(report.runs[1].status(), RunStatus::Success);
}

#[tokio::test]
async fn test_pacer_runs_between_targets_only() {
    let scraper = Arc::new(
        ScriptedScraper::default()
            .with("a", vec!["a1"])
            .with("b", vec!["b1"])
            .with("c", vec!["c1"])
            .with("d", vec!["d1"]),
    );
    let enricher = FakeEnricher::default();
    let store = SqliteStore::in_memory().unwrap();
    let pacer = CountingPacer::default();

    Harvester::new(
        scraper.clone(),
        &enricher,
        &store,
        &pacer,
        HarvestOptions::default(),
    )
    .run(queue(&["a", "b", "c", "d"]))
    .await;

    assert_eq!(pacer.waits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_single_target_never_waits() {
    let scraper = Arc::new(ScriptedScraper::default().with("solo", vec!["s1"]));
    let enricher = FakeEnricher::default();
    let store = SqliteStore::in_memory().unwrap();
    let pacer = CountingPacer::default();

    Harvester::new(
        scraper.clone(),
        &enricher,
        &store,
        &pacer,
        HarvestOptions::default(),
    )
    .run(queue(&["solo"]))
    .await;

    assert_eq!(pacer.waits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_second_run_skips_stored_reels() {
    let scraper = Arc::new(ScriptedScraper::default().with("a", vec!["a1", "a2"]));
    let enricher = FakeEnricher::default();
    let store = SqliteStore::in_memory().unwrap();
    let pacer = CountingPacer::default();
    let harvester = Harvester::new(
        scraper.clone(),
        &enricher,
        &store,
        &pacer,
        HarvestOptions::default(),
    );

    let first = harvester.run(queue(&["a"])).await.report;
    let second = harvester.run(queue(&["a"])).await.report;

    assert_eq!(first.total_items_persisted, 2);
    assert_eq!(second.total_items_persisted, 0);
    assert_eq!(second.total_items_skipped, 2);
    assert_eq!(second.runs[0].status(), RunStatus::Partial);
    assert_eq!(store.count_reels().unwrap(), 2);
}

#[tokio::test]
async fn test_enrich_failure_is_isolated_to_the_item() {
    let scraper = Arc::new(ScriptedScraper::default().with("a", vec!["a1", "a2", "a3"]));
    let enricher = FakeEnricher { fail: vec!["a2"] };
    let store = SqliteStore::in_memory().unwrap();
    let pacer = CountingPacer::default();

    let output = Harvester::new(
        scraper.clone(),
        &enricher,
        &store,
        &pacer,
        HarvestOptions::default(),
    )
    .run(queue(&["a"]))
    .await;

    assert_eq!(output.report.succeeded_targets, 1);
    assert_eq!(output.report.partial_targets, 1);
    assert_eq!(output.report.item_failures, 1);
    assert!(output.report.failed_targets.is_empty());
    let ids: Vec<&str> = output.items.iter().map(|i| i.reel_id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a3"]);
    assert!(store.get_reel("a2").unwrap().is_none());
}

#[tokio::test]
async fn test_scraper_released_once_after_run() {
    let scraper = Arc::new(ScriptedScraper::default().with("a", vec!["a1"]));
    let enricher = FakeEnricher::default();
    let store = SqliteStore::in_memory().unwrap();
    let pacer = CountingPacer::default();

    Harvester::new(
        scraper.clone(),
        &enricher,
        &store,
        &pacer,
        HarvestOptions::default(),
    )
    .run(queue(&["a", "missing"]))
    .await;

    assert_eq!(scraper.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_max_items_bounds_each_target() {
    let scraper = Arc::new(ScriptedScraper::default().with("a", vec!["a1", "a2", "a3", "a4"]));
    let enricher = FakeEnricher::default();
    let store = SqliteStore::in_memory().unwrap();
    let pacer = CountingPacer::default();
    let options = HarvestOptions {
        max_items_per_target: 2,
        ..HarvestOptions::default()
    };

    let report = Harvester::new(scraper.clone(), &enricher, &store, &pacer, options)
        .run(queue(&["a"]))
        .await
        .report;

    assert_eq!(report.runs[0].items_scraped(), 2);
    assert_eq!(report.total_items_persisted, 2);
}

#[tokio::test]
async fn test_scraper_released_when_run_is_dropped() {
    let scraper = Arc::new(
        ScriptedScraper::default()
            .with("a", vec!["a1"])
            .with("b", vec!["b1"]),
    );
    let enricher = FakeEnricher::default();
    let store = SqliteStore::in_memory().unwrap();
    let harvester = Harvester::new(
        scraper.clone(),
        &enricher,
        &store,
        &StalledPacer,
        HarvestOptions::default(),
    );

    let outcome =
        tokio::time::timeout(Duration::from_millis(200), harvester.run(queue(&["a", "b"]))).await;
    assert!(outcome.is_err());

    // Release runs on a spawned task once the run future is gone
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(scraper.releases.load(Ordering::SeqCst), 1);
    assert_eq!(*scraper.calls.lock().unwrap(), vec!["a".to_string()]);
}

#[tokio::test]
async fn test_shutdown_marks_remaining_targets_cancelled() {
    let scraper = Arc::new(
        ScriptedScraper::default()
            .with("a", vec!["a1"])
            .with("b", vec!["b1"]),
    );
    let enricher = FakeEnricher::default();
    let store = SqliteStore::in_memory().unwrap();
    let harvester = Harvester::new(
        scraper.clone(),
        &enricher,
        &store,
        &StalledPacer,
        HarvestOptions::default(),
    );

    let output = harvester
        .run_until(
            queue(&["a", "b"]),
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await;
    let report = output.report;

    assert_eq!(scraper.releases.load(Ordering::SeqCst), 1);
    assert_eq!(report.total_targets, 2);
    assert_eq!(report.succeeded_targets, 1);
    assert_eq!(report.failed_targets.len(), 1);
    assert_eq!(report.failed_targets[0].target, "@b");
    assert_eq!(report.failed_targets[0].reason, CANCELLED);
    assert!(report.is_consistent());
    assert_eq!(output.items.len(), 1);
    assert_eq!(store.count_reels().unwrap(), 1);
}

async fn mount_actor(server: &MockServer, handle: &str, items: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/acts/reel-actor/run-sync-get-dataset-items"))
        .and(body_partial_json(json!({ "username": [handle] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

async fn mount_enricher(server: &MockServer) {
    let reply = json!({
        "ai_summary": "A short clip",
        "category": ["Comedy"],
        "sentiment": "Positive",
        "top_comment_summary": ""
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": reply.to_string() } }]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.5, 0.25] }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_harvest_end_to_end() {
    let actor = MockServer::start().await;
    let ai = MockServer::start().await;
    mount_actor(
        &actor,
        "comedy",
        json!([
            {
                "shortCode": "Ra1",
                "url": "https://www.instagram.com/reel/Ra1/",
                "caption": "first",
                "ownerUsername": "comedy",
                "likesCount": 5,
                "videoPlayCount": 50
            },
            {
                "shortCode": "Ra2",
                "url": "https://www.instagram.com/reel/Ra2/",
                "caption": "second",
                "ownerUsername": "comedy"
            }
        ]),
    )
    .await;
    mount_actor(&actor, "ghost", json!([])).await;
    mount_enricher(&ai).await;

    std::env::set_var("REEL_HARVEST_E2E_TOKEN", "actor-token");
    std::env::set_var("REEL_HARVEST_E2E_KEY", "sk-test");

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("reels.db");
    let json_path = dir.path().join("reels.json");
    let summary_path = dir.path().join("summary.md");

    let toml = format!(
        r#"
targets = ["@comedy", "@ghost"]

[run]
max-items-per-target = 5
method = "api"
inter-target-delay-seconds = 0
output-path = "{json}"
summary-path = "{summary}"

[storage]
database-path = "{db}"

[api]
base-url = "{actor}"
actor = "reel-actor"
token-env = "REEL_HARVEST_E2E_TOKEN"

[enricher]
base-url = "{ai}"
api-key-env = "REEL_HARVEST_E2E_KEY"
"#,
        json = json_path.display(),
        summary = summary_path.display(),
        db = db_path.display(),
        actor = actor.uri(),
        ai = ai.uri(),
    );
    let config = parse_config(&toml).unwrap();

    let report = run_harvest(&config, "e2e-hash").await.unwrap();

    assert_eq!(report.total_targets, 2);
    assert_eq!(report.succeeded_targets, 1);
    assert_eq!(report.total_items_persisted, 2);
    assert_eq!(report.failed_targets.len(), 1);
    assert_eq!(report.failed_targets[0].target, "@ghost");

    let store = SqliteStore::new(&db_path).unwrap();
    assert_eq!(store.count_reels().unwrap(), 2);
    let reel = store.get_reel("Ra1").unwrap().unwrap();
    assert_eq!(reel.sentiment, "Positive");
    assert_eq!(reel.views, 50);

    let runs = store.recent_runs(1).unwrap();
    assert_eq!(runs[0].config_hash, "e2e-hash");
    assert_eq!(runs[0].succeeded_targets, 1);
    assert_eq!(runs[0].items_persisted, 2);
    let failed = store.failed_targets(runs[0].id).unwrap();
    assert_eq!(
        failed,
        vec![("@ghost".to_string(), Some("no_content_found".to_string()))]
    );

    let artifact: Vec<EnrichedItem> =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(artifact.len(), 2);
    assert_eq!(artifact[0].category, vec!["Comedy".to_string()]);

    let summary = std::fs::read_to_string(&summary_path).unwrap();
    assert!(summary.contains("| @ghost | no_content_found |"));
}
