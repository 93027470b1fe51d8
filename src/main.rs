//! Spider-Index main entry point
//!
//! This is the command-line interface for the Spider-Index seed crawler.

use anyhow::{Context, Result};
use clap::Parser;
use spider_index::config::{load_config_with_hash, Config};
use spider_index::crawler::{CrawlOrchestrator, HttpFetcher};
use spider_index::index::SqliteIndex;
use spider_index::output::{
    load_statistics, print_cycle_report, print_eligible, print_search_hits, print_statistics,
};
use spider_index::scheduler::CycleScheduler;
use spider_index::storage::{open_storage, ArticleStore, SqliteStorage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Spider-Index: a seed-driven crawler feeding a full-text index
///
/// Spider-Index crawls configured seed articles on a cron schedule,
/// follows same-domain links up to a depth limit, and indexes every page
/// it discovers for the first time.
#[derive(Parser, Debug)]
#[command(name = "spider-index")]
#[command(version = "1.0.0")]
#[command(about = "A seed-driven crawler feeding a full-text index", long_about = None)]
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

    /// Run a single crawl cycle and exit instead of starting the scheduler
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "search"])]
    once: bool,

    /// Validate config and list eligible seeds without crawling
    #[arg(long, conflicts_with_all = ["once", "stats", "search"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["once", "dry_run", "search"])]
    stats: bool,

    /// Query the full-text index and exit
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["once", "dry_run", "stats"])]
    search: Option<String>,

    /// Maximum number of search results
    #[arg(long, default_value_t = 10, requires = "search")]
    limit: usize,
}

type Orchestrator = CrawlOrchestrator<SqliteStorage, HttpFetcher, SqliteIndex>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(query) = &cli.search {
        handle_search(&config, query, cli.limit)
    } else if cli.once {
        handle_once(config).await
    } else {
        handle_schedule(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spider_index=info,warn"),
            1 => EnvFilter::new("spider_index=debug,info"),
            2 => EnvFilter::new("spider_index=trace,debug"),
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

/// Opens both databases and builds the production orchestrator
fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))?;
    let index = SqliteIndex::new(Path::new(&config.output.index_path))
        .with_context(|| format!("Failed to open index {}", config.output.index_path))?;
    let fetcher = HttpFetcher::new(&config.user_agent, config.spider.fetch_timeout())
        .context("Failed to build HTTP client")?;

    Ok(CrawlOrchestrator::new(
        config.spider.clone(),
        Arc::new(Mutex::new(storage)),
        fetcher,
        Arc::new(Mutex::new(index)),
    ))
}

/// Seeds configured articles and fails any left over from a crashed run
fn prepare(orchestrator: &Orchestrator, config: &Config) -> Result<()> {
    let seeded = orchestrator
        .seed_articles(&config.articles)
        .context("Failed to seed articles")?;
    tracing::info!("{} seed articles configured", seeded);

    let recovered = orchestrator
        .recover_interrupted()
        .context("Failed to recover interrupted seeds")?;
    if recovered > 0 {
        tracing::warn!("Recovered {} seeds interrupted by a previous run", recovered);
    }
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Spider-Index Dry Run ===\n");

    println!("Spider Configuration:");
    println!("  Max depth: {}", config.spider.max_depth);
    println!("  Max retries: {}", config.spider.max_retries);
    println!("  Fetch timeout: {}s", config.spider.fetch_timeout_secs);
    println!("  Concurrent seeds: {}", config.spider.max_concurrent_seeds);
    println!("  Claim lease: {}s", config.spider.claim_lease_secs);

    println!("\nSchedule:");
    println!("  Cron: {}", config.schedule.cron);
    println!("  Run on start: {}", config.schedule.run_on_start);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Index: {}", config.output.index_path);

    println!("\nConfigured Articles ({}):", config.articles.len());
    for article in &config.articles {
        println!("  - {} \"{}\" (priority {})", article.url, article.title, article.priority);
    }
    println!();

    // Only read an existing database; a dry run never creates one
    let db_path = Path::new(&config.output.database_path);
    if db_path.exists() {
        let storage = SqliteStorage::new(db_path).context("Failed to open database")?;
        let eligible = storage
            .get_eligible(config.spider.max_retries)
            .context("Failed to query eligible seeds")?;
        print_eligible(&eligible, config.spider.max_retries);
    } else {
        println!("Database does not exist yet; every configured article is eligible.");
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}", config.output.database_path);
    println!("Index: {}\n", config.output.index_path);

    let storage =
        open_storage(Path::new(&config.output.database_path)).context("Failed to open database")?;

    let index_path = Path::new(&config.output.index_path);
    let index = if index_path.exists() {
        Some(SqliteIndex::new(index_path).context("Failed to open index")?)
    } else {
        None
    };

    let stats = load_statistics(&storage, index.as_ref()).context("Failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --search mode: queries the full-text index
fn handle_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    let index = SqliteIndex::new(Path::new(&config.output.index_path))
        .context("Failed to open index")?;
    let hits = index
        .search(query, limit)
        .with_context(|| format!("Search for \"{}\" failed", query))?;

    print_search_hits(query, &hits);
    Ok(())
}

/// Handles the --once mode: runs a single crawl cycle
async fn handle_once(config: Config) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    prepare(&orchestrator, &config)?;

    let report = orchestrator
        .run_cycle()
        .await
        .context("Crawl cycle failed")?;
    print_cycle_report(&report);

    Ok(())
}

/// Handles the default mode: runs crawl cycles on the configured schedule
async fn handle_schedule(config: Config) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    prepare(&orchestrator, &config)?;

    let scheduler = CycleScheduler::new(Arc::new(orchestrator), config.schedule.clone());
    scheduler
        .run_until_shutdown()
        .await
        .context("Scheduler stopped with an error")?;

    tracing::info!("Spider-Index stopped");
    Ok(())
}
