//! Campaign-Sieve main entry point
//!
//! This is the command-line interface for the Campaign-Sieve campaign
//! harvester.

use anyhow::{bail, Context};
use campaign_sieve::config::{load_config_with_hash, Config, ListingMode};
use campaign_sieve::crawler::{Pacer, Pipeline};
use campaign_sieve::output::{load_statistics, print_run_summary, print_statistics};
use campaign_sieve::storage::{open_storage, SlugUpsertCoordinator};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Campaign-Sieve: a campaign harvester for card-issuer websites
///
/// Campaign-Sieve discovers campaign pages on one bank or card site,
/// extracts a uniform record from each, keeps a JSON artifact up to date
/// after every record and upserts the records into SQLite under
/// collision-free slugs.
#[derive(Parser, Debug)]
#[command(name = "campaign-sieve")]
#[command(version)]
#[command(about = "Harvests campaigns from card-issuer websites", long_about = None)]
struct Cli {
    /// Path to the site's TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Process at most this many campaign links
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with_all = ["stats", "backfill_slugs"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "backfill_slugs"])]
    stats: bool,

    /// Repair missing or mismatched slugs in the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    backfill_slugs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.limit);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.backfill_slugs {
        handle_backfill(&config)?;
    } else {
        handle_run(config, config_hash, cli.limit).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("campaign_sieve=info,warn"),
            1 => EnvFilter::new("campaign_sieve=debug,info"),
            2 => EnvFilter::new("campaign_sieve=trace,debug"),
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

fn database_path(config: &Config) -> anyhow::Result<&Path> {
    match config.output.database_path.as_deref() {
        Some(path) => Ok(Path::new(path)),
        None => bail!("no database-path configured in [output]"),
    }
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &Config, limit: Option<usize>) {
    println!("=== Campaign-Sieve Dry Run ===\n");

    println!("Site:");
    println!("  Name: {}", config.site.name);
    println!("  Bank: {}", config.site.bank);
    println!("  Card: {}", config.site.card);
    println!("  Base URL: {}", config.site.base_url);

    println!("\nListing:");
    match config.listing.mode {
        ListingMode::Paged => {
            println!("  Mode: paged");
            println!(
                "  URL template: {}",
                config.listing.url_template.as_deref().unwrap_or_default()
            );
            println!("  Start page: {}", config.listing.start_page);
        }
        ListingMode::InfiniteScroll => {
            println!("  Mode: infinite scroll");
            println!("  URL: {}", config.listing.url.as_deref().unwrap_or_default());
            if let Some(control) = &config.listing.load_more {
                println!("  Load-more control: {}", control);
            }
        }
    }
    println!("  Max iterations: {}", config.listing.max_iterations);
    println!("  Link strategies: {}", config.listing.links.len());
    match limit.or(config.listing.limit) {
        Some(limit) => println!("  Limit: {} link(s)", limit),
        None => println!("  Limit: none"),
    }

    println!("\nDetail Pages:");
    println!("  Ready marker: {}", config.detail.ready_marker);
    println!("  Title strategies: {}", config.detail.title.len());
    println!("  Description strategies: {}", config.detail.description.len());
    println!("  Image strategies: {}", config.detail.image.len());
    println!("  Content strategies: {}", config.detail.content.len());

    let (min, max) = Pacer::from_config(&config.politeness).bounds();
    println!("\nPoliteness:");
    println!("  Delay: {}-{}ms", min.as_millis(), max.as_millis());
    println!("  Max attempts: {}", config.retry.max_attempts);

    println!("\nOutput:");
    if let Some(path) = &config.output.json_path {
        println!("  JSON artifact: {}", path);
    }
    if let Some(path) = &config.output.database_path {
        println!("  Database: {}", path);
        println!("  Skip existing: {}", config.output.skip_existing);
    }
    if let Some(endpoint) = &config.session.render_endpoint {
        println!("  Render endpoint: {}", endpoint);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = database_path(config)?;
    println!("Database: {}\n", path.display());

    let storage = open_storage(path)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --backfill-slugs mode
fn handle_backfill(config: &Config) -> anyhow::Result<()> {
    let path = database_path(config)?;
    let storage = open_storage(path)?;
    let mut upserter = SlugUpsertCoordinator::new(storage);

    let report = upserter.backfill_missing()?;

    println!("=== Slug Backfill ===\n");
    println!("  Rows needing repair: {}", report.examined);
    println!("  Repaired: {}", report.repaired);
    println!("  Failed: {}", report.failed);

    Ok(())
}

/// Handles the main harvesting run
async fn handle_run(
    config: Config,
    config_hash: String,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let mut pipeline =
        Pipeline::from_config(config, config_hash).context("failed to start the harvesting run")?;

    let summary = pipeline.run(limit).await?;
    print_run_summary(&summary);

    Ok(())
}
