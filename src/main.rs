//! pkgsearch main entry point
//!
//! This is the command-line interface for the package search crawler.

use anyhow::Context;
use clap::Parser;
use pkgsearch::config::{load_config_with_hash, Config};
use pkgsearch::crawler::{crawl, CrawlContext};
use pkgsearch::discovery::{fetch_package_list, ImportSegments};
use pkgsearch::storage::{open_storage, EntryKind, Storage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// pkgsearch: crawler for a package search engine
///
/// Each invocation is one crawl run: bulk imports are scheduled, then due
/// packages and their authors are crawled until the run deadline.
#[derive(Parser, Debug)]
#[command(name = "pkgsearch")]
#[command(version = "1.0.0")]
#[command(about = "Package search crawler", long_about = None)]
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

    /// Validate config and show what is due without crawling
    #[arg(long, conflicts_with_all = ["stats", "import", "fetch_package_list"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "import", "fetch_package_list"])]
    stats: bool,

    /// Queue the import paths listed in FILE (one per line) and exit
    #[arg(long, value_name = "FILE", conflicts_with = "fetch_package_list")]
    import: Option<PathBuf>,

    /// Queue every package known to the document service and exit
    #[arg(long)]
    fetch_package_list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(file) = &cli.import {
        handle_import(&config, file)?;
    } else if cli.fetch_package_list {
        handle_fetch_package_list(&config).await?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pkgsearch=info,warn"),
            1 => EnvFilter::new("pkgsearch=debug,info"),
            2 => EnvFilter::new("pkgsearch=trace,debug"),
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

/// Handles the --dry-run mode: shows the configuration and the due work
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== pkgsearch Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Run length: {} minutes", config.crawler.due_per_run_minutes);
    println!("  Max concurrent crawls: {}", config.crawler.max_concurrent_crawls);
    println!("  Re-crawl interval: {}h", config.crawler.recrawl_interval_hours);
    println!("  Person interval: {}h", config.crawler.person_interval_hours);
    println!("  Retry after: {}h", config.crawler.retry_after_hours);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nEndpoints:");
    println!("  Documents: {}", config.endpoints.doc_api);
    println!("  GitHub API: {}", config.endpoints.github_api);
    println!("  Bitbucket API: {}", config.endpoints.bitbucket_api);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let now = chrono::Utc::now();
    let packages = storage.due_entries(EntryKind::Package, now)?;
    let persons = storage.due_entries(EntryKind::Person, now)?;
    let segments = ImportSegments::new(&config.storage.imports_dir).done_segments()?;

    println!("\nDue Work:");
    println!("  Packages: {}", packages.len());
    for (path, _) in packages.iter().take(10) {
        println!("    * {}", path);
    }
    println!("  Persons: {}", persons.len());
    println!("  Import segments: {}", segments.len());

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = storage.stats()?;

    println!("Packages tracked:  {}", stats.packages);
    println!("Persons tracked:   {}", stats.persons);
    println!("Stored snapshots:  {}", stats.docs);
    println!("Index actions:     {}", stats.actions);
    println!("Runs:              {}", stats.runs);

    if let Some(run) = storage.get_latest_run()? {
        println!(
            "\nLatest run: #{} ({}) started {}",
            run.id,
            run.status.to_db_string(),
            run.started_at
        );
    }

    Ok(())
}

/// Handles the --import mode: writes the listed paths as a new segment
fn handle_import(config: &Config, file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let packages: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();

    let segment = ImportSegments::new(&config.storage.imports_dir).append_packages(&packages)?;
    println!(
        "✓ Queued {} packages in segment {}",
        packages.len(),
        segment.number
    );
    Ok(())
}

/// Handles the --fetch-package-list mode: imports the service's package list
async fn handle_fetch_package_list(config: &Config) -> anyhow::Result<()> {
    let ctx = CrawlContext::from_config(config)?;
    let packages = fetch_package_list(ctx.client.as_ref(), &config.endpoints.package_list)
        .await
        .context("fetching package list")?;

    let segment = ImportSegments::new(&config.storage.imports_dir).append_packages(&packages)?;
    println!(
        "✓ Queued {} packages in segment {}",
        packages.len(),
        segment.number
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    match crawl(config, config_hash).await {
        Ok(summary) => {
            tracing::info!(
                "Run {} completed: {} imported, {} updated, {} stars-only, {} not modified, {} deleted, {} failed, {} persons",
                summary.run_id,
                summary.imported,
                summary.packages.updated,
                summary.packages.stars_only,
                summary.packages.not_modified,
                summary.packages.deleted,
                summary.packages.failed,
                summary.persons.crawled
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
