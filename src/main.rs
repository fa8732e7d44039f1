//! Reel-Harvest main entry point
//!
//! This is the command-line interface for the Reel-Harvest bulk ingester.

use anyhow::Context;
use clap::Parser;
use reel_harvest::config::{load_config_with_overrides, parse_targets, Config, ScrapeMethod};
use reel_harvest::output::{load_statistics, print_report, print_statistics};
use reel_harvest::harvest::run_harvest_until;
use reel_harvest::storage::SqliteStore;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Reel-Harvest: a paced bulk ingester for short-form video
///
/// Reel-Harvest walks a list of accounts, tags and reel URLs, scrapes each
/// one, enriches every reel with AI-derived fields, and stores the results
/// in SQLite while reporting per-target success and failure.
#[derive(Parser, Debug)]
#[command(name = "reel-harvest")]
#[command(version)]
#[command(about = "A paced bulk ingester for short-form video", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Quick mode: 3 reels per target, 30s delay
    #[arg(long)]
    quick: bool,

    /// Maximum reels per target
    #[arg(long, value_name = "N")]
    max_items: Option<u32>,

    /// Delay between targets in seconds
    #[arg(long, value_name = "SECONDS")]
    delay: Option<u64>,

    /// Scraping method
    #[arg(long, value_parser = ["api", "browser"])]
    method: Option<String>,

    /// Resolve a direct CDN link for every reel
    #[arg(long)]
    resolve_cdn: bool,

    /// Skip the existence check before enrichment
    #[arg(long)]
    no_dedupe: bool,

    /// Write enriched reels to this JSON file
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Download every enriched reel's video into this directory
    #[arg(long, value_name = "DIR")]
    download: Option<String>,

    /// Target to harvest (repeatable); replaces the configured targets
    #[arg(short, long = "target", value_name = "TARGET")]
    targets: Vec<String>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if !self.targets.is_empty() {
            config.targets = self.targets.clone();
        }
        if self.quick {
            config.run.apply_quick_preset();
        }
        if let Some(max_items) = self.max_items {
            config.run.max_items_per_target = max_items;
        }
        if let Some(delay) = self.delay {
            config.run.inter_target_delay_seconds = delay;
        }
        match self.method.as_deref() {
            Some("api") => config.run.method = ScrapeMethod::Api,
            Some("browser") => config.run.method = ScrapeMethod::Browser,
            _ => {}
        }
        if self.resolve_cdn {
            config.run.resolve_cdn = true;
        }
        if self.no_dedupe {
            config.run.dedupe_before_insert = false;
        }
        if let Some(output) = &self.output {
            config.run.output_path = Some(output.clone());
        }
        if let Some(dir) = &self.download {
            config.extractor.download_dir = Some(dir.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Secrets may come from a local .env file
    let dotenv = dotenvy::dotenv();

    setup_logging(cli.verbose, cli.quiet);

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) =
        load_config_with_overrides(&cli.config, |config| cli.apply_overrides(config))
            .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.quick {
        tracing::info!(
            "Quick mode enabled: {} reels/target, {}s delay",
            config.run.max_items_per_target,
            config.run.inter_target_delay_seconds
        );
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reel_harvest=info,warn"),
            1 => EnvFilter::new("reel_harvest=debug,info"),
            2 => EnvFilter::new("reel_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the plan
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let targets = parse_targets(&config.targets)?;
    let run = &config.run;

    println!("=== Reel-Harvest Dry Run ===\n");

    println!("Run Configuration:");
    println!("  Method: {}", run.method.as_str());
    println!("  Max reels per target: {}", run.max_items_per_target);
    println!("  Delay between targets: {}s", run.inter_target_delay_seconds);
    println!("  Use login: {}", run.use_login);
    println!("  Resolve CDN links: {}", run.resolve_cdn);
    println!("  Dedupe before insert: {}", run.dedupe_before_insert);

    println!("\nOutput:");
    println!("  Database: {}", config.storage.database_path);
    println!(
        "  JSON: {}",
        run.output_path.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Summary: {}",
        run.summary_path.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Downloads: {}",
        config.extractor.download_dir.as_deref().unwrap_or("(none)")
    );

    println!("\nTargets ({}):", targets.len());
    for target in &targets {
        println!("  - {} ({})", target, target.kind().as_str());
    }

    let max_reels = targets.len() as u64 * u64::from(run.max_items_per_target);
    let pause = targets.len().saturating_sub(1) as u64 * run.inter_target_delay_seconds;

    println!("\n✓ Configuration is valid");
    println!("✓ Would harvest up to {} reels", max_reels);
    println!("✓ Pacing adds at least {} minutes", pause / 60);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = SqliteStore::new(Path::new(&config.storage.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Targets: {}, method: {}, max reels/target: {}, delay: {}s",
        config.targets.len(),
        config.run.method.as_str(),
        config.run.max_items_per_target,
        config.run.inter_target_delay_seconds
    );

    // Ctrl-C stops the queue; the scraper is still released before we return
    let report = run_harvest_until(config, config_hash, shutdown_signal())
        .await
        .context("Harvest aborted")?;

    print_report(&report);
    Ok(())
}

/// Completes on Ctrl-C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Received shutdown signal, finishing up");
}
