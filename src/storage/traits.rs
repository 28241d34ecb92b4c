//! Storage traits and error types
//!
//! This module defines the trait interfaces for storage backends and
//! associated error types.

use crate::crawler::CampaignRecord;
use crate::storage::{CampaignCount, RunCounts, RunRecord, RunStatus, SlugRow, StoredCampaign};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Campaign rows keyed by reference URL
///
/// This is the contract the slug upsert coordinator relies on. Backends
/// that can run a multi-statement transaction say so through
/// [`CampaignStore::is_transactional`]; the others get the two-step
/// insert-then-slug sequence.
pub trait CampaignStore {
    // ===== Campaign Rows =====

    /// Finds the id of the row stored under a reference URL
    fn lookup_by_reference_url(&self, url: &str) -> StorageResult<Option<i64>>;

    /// Inserts a record without a slug and returns the id storage assigned
    fn insert(&mut self, record: &CampaignRecord) -> StorageResult<i64>;

    /// Overwrites a row's mutable fields and its slug in one write
    fn update(&mut self, id: i64, record: &CampaignRecord, slug: &str) -> StorageResult<()>;

    /// Sets only the slug of a row
    fn set_slug(&mut self, id: i64, slug: &str) -> StorageResult<()>;

    /// Gets a stored campaign by id
    fn get_campaign(&self, id: i64) -> StorageResult<StoredCampaign>;

    /// Rows whose slug is missing, empty, or may not end in their own id
    ///
    /// Implementations may over-report; callers re-check each row.
    fn slug_repair_candidates(&self) -> StorageResult<Vec<SlugRow>>;

    // ===== Transactions =====

    fn is_transactional(&self) -> bool {
        false
    }

    fn begin(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

/// Run ledger and statistics
pub trait RunStore {
    // ===== Run Management =====

    /// Creates a new run record
    ///
    /// # Arguments
    ///
    /// * `site` - Name of the harvested site
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, site: &str, config_hash: &str) -> StorageResult<i64>;

    /// Stores final counts and status with a finish timestamp
    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counts: &RunCounts,
    ) -> StorageResult<()>;

    /// Gets the most recent runs, newest first
    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Statistics =====

    fn count_campaigns(&self) -> StorageResult<u64>;

    /// Counts rows with a null or empty slug
    fn count_missing_slugs(&self) -> StorageResult<u64>;

    /// Campaign counts per bank and card, largest first
    fn count_by_card(&self) -> StorageResult<Vec<CampaignCount>>;
}
