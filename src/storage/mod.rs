//! Storage module for persisting harvested campaigns
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Campaign rows keyed by reference URL, with id-suffixed slugs
//! - The slug upsert coordinator and slug backfill
//! - Run tracking and statistics

mod schema;
mod sqlite;
mod traits;
mod upsert;

pub use sqlite::SqliteStorage;
pub use traits::{CampaignStore, RunStore, StorageError, StorageResult};
pub use upsert::{BackfillReport, SlugUpsertCoordinator, UpsertOutcome};
pub(crate) use upsert::needs_repair;

use crate::SieveError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SieveError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SieveError> {
    SqliteStorage::new(path)
}

/// Represents a campaign row in the database
#[derive(Debug, Clone)]
pub struct StoredCampaign {
    pub id: i64,
    pub reference_url: String,
    pub slug: Option<String>,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub bank: String,
    pub card: String,
    pub created_at: String,
    pub updated_at: String,
}

/// The columns slug repair needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugRow {
    pub id: i64,
    pub title: String,
    pub slug: Option<String>,
}

/// Number of campaigns stored for one bank/card pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignCount {
    pub bank: String,
    pub card: String,
    pub count: u64,
}

/// Counts stored with a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub links_found: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Represents a harvesting run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub site: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub counts: RunCounts,
}

/// Status of a harvesting run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
