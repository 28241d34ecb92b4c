//! Statistics from the campaign database and the run summary
//!
//! This module provides functionality for extracting and displaying
//! statistics from the storage layer, and for printing the end-of-run
//! summary.

use crate::crawler::RunSummary;
use crate::storage::{
    needs_repair, CampaignCount, CampaignStore, RunRecord, RunStore, StorageResult,
};

/// Number of runs listed by `--stats`
const RECENT_RUNS: usize = 5;

/// Database statistics summary
#[derive(Debug, Clone)]
pub struct DatabaseStatistics {
    /// Total number of stored campaigns
    pub total_campaigns: u64,

    /// Rows with a null or empty slug
    pub missing_slugs: u64,

    /// Rows whose slug does not end in their own id
    pub mismatched_slugs: u64,

    /// Campaign counts per bank and card
    pub by_card: Vec<CampaignCount>,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(DatabaseStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics<S: CampaignStore + RunStore>(
    storage: &S,
) -> StorageResult<DatabaseStatistics> {
    let total_campaigns = storage.count_campaigns()?;
    let missing_slugs = storage.count_missing_slugs()?;

    let mismatched_slugs = storage
        .slug_repair_candidates()?
        .iter()
        .filter(|row| row.slug.as_deref().is_some_and(|slug| !slug.is_empty()))
        .filter(|row| needs_repair(row))
        .count() as u64;

    Ok(DatabaseStatistics {
        total_campaigns,
        missing_slugs,
        mismatched_slugs,
        by_card: storage.count_by_card()?,
        recent_runs: storage.recent_runs(RECENT_RUNS)?,
    })
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &DatabaseStatistics) {
    println!("=== Campaign Database Statistics ===\n");

    println!("Overview:");
    println!("  Total campaigns: {}", stats.total_campaigns);
    let with_slug = stats.total_campaigns - stats.missing_slugs.min(stats.total_campaigns);
    println!(
        "  With slug: {} ({:.1}%)",
        with_slug,
        percentage(with_slug, stats.total_campaigns)
    );
    println!("  Missing slug: {}", stats.missing_slugs);
    println!("  Slug/id mismatches: {}", stats.mismatched_slugs);
    println!();

    if !stats.by_card.is_empty() {
        println!("Campaigns by Card:");
        for entry in &stats.by_card {
            println!(
                "  {} / {}: {} ({:.1}%)",
                entry.bank,
                entry.card,
                entry.count,
                percentage(entry.count, stats.total_campaigns)
            );
        }
        println!();
    }

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.recent_runs {
            println!(
                "  #{} {} [{}] started {}: {} processed, {} succeeded, {} failed",
                run.id,
                run.site,
                run.status.to_db_string(),
                run.started_at,
                run.counts.processed,
                run.counts.succeeded,
                run.counts.failed
            );
        }
        println!();
    }

    if stats.missing_slugs + stats.mismatched_slugs > 0 {
        println!("Run with --backfill-slugs to repair slugs.");
    }
}

/// Prints the end-of-run summary to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Run Summary ===\n");

    println!("Listing:");
    println!("  Links discovered: {}", summary.discovered);
    if summary.skipped > 0 {
        println!("  Already stored (skipped): {}", summary.skipped);
    }
    if let Some(reason) = &summary.stop_reason {
        println!("  Stopped because: {}", reason);
    }
    println!();

    println!("Detail Pages:");
    println!("  Processed: {}", summary.processed);
    println!(
        "  Succeeded: {} ({:.1}%)",
        summary.succeeded,
        percentage(summary.succeeded as u64, summary.processed as u64)
    );
    println!("  Failed: {}", summary.failed);
    println!("  Field fallbacks: {}", summary.fallbacks);
    println!();

    if summary.inserted + summary.updated + summary.missing_slug + summary.persist_failed > 0 {
        println!("Database:");
        println!("  Inserted: {}", summary.inserted);
        println!("  Updated: {}", summary.updated);
        if summary.missing_slug > 0 {
            println!("  Stored without slug: {}", summary.missing_slug);
        }
        println!("  Failed: {}", summary.persist_failed);
        println!();
    }

    if summary.artifact_failures > 0 {
        println!("JSON artifact write failures: {}", summary.artifact_failures);
        println!();
    }
}
