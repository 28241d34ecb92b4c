//! Slug upsert coordination
//!
//! Every stored campaign gets a slug of the form `<slugified-title>-<id>`.
//! The id is only known after the row exists, so a new campaign is written
//! in two steps. On a transactional store both steps commit or neither does;
//! on other stores a failed slug write leaves a slug-less row that
//! [`SlugUpsertCoordinator::backfill_missing`] repairs later.

use crate::crawler::CampaignRecord;
use crate::slug::{campaign_slug, slug_id};
use crate::storage::traits::{CampaignStore, StorageResult};
use crate::storage::SlugRow;
use tracing::{debug, warn};

/// What happened to one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The reference URL was already stored; fields and slug were rewritten
    Updated { id: i64, slug: String },
    Inserted { id: i64, slug: String },
    /// The row exists but its slug write failed
    InsertedWithoutSlug { id: i64, reason: String },
    /// Nothing was written
    Failed { reason: String },
}

impl UpsertOutcome {
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Updated { id, .. }
            | Self::Inserted { id, .. }
            | Self::InsertedWithoutSlug { id, .. } => Some(*id),
            Self::Failed { .. } => None,
        }
    }
}

/// Result of a slug backfill pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub examined: usize,
    pub repaired: usize,
    pub failed: usize,
}

/// Upserts campaign records keyed by reference URL
pub struct SlugUpsertCoordinator<S: CampaignStore> {
    store: S,
}

impl<S: CampaignStore> SlugUpsertCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Checks whether a reference URL is already stored
    pub fn is_known(&self, url: &str) -> StorageResult<bool> {
        Ok(self.store.lookup_by_reference_url(url)?.is_some())
    }

    /// Inserts or updates a record and gives it its slug
    ///
    /// Storage failures are reported in the outcome rather than returned,
    /// so one bad record never stops a run.
    pub fn upsert(&mut self, record: &CampaignRecord) -> UpsertOutcome {
        let existing = match self.store.lookup_by_reference_url(&record.url) {
            Ok(existing) => existing,
            Err(e) => return failed(record, "lookup", e.to_string()),
        };

        match existing {
            Some(id) => self.update_existing(id, record),
            None if self.store.is_transactional() => self.insert_atomic(record),
            None => self.insert_then_slug(record),
        }
    }

    fn update_existing(&mut self, id: i64, record: &CampaignRecord) -> UpsertOutcome {
        let slug = campaign_slug(&record.title, id);
        match self.store.update(id, record, &slug) {
            Ok(()) => {
                debug!("Updated campaign {} as {}", id, slug);
                UpsertOutcome::Updated { id, slug }
            }
            Err(e) => failed(record, "update", e.to_string()),
        }
    }

    fn insert_atomic(&mut self, record: &CampaignRecord) -> UpsertOutcome {
        if let Err(e) = self.store.begin() {
            return failed(record, "begin", e.to_string());
        }

        let written = insert_with_slug(&mut self.store, record).and_then(|(id, slug)| {
            self.store.commit()?;
            Ok((id, slug))
        });

        match written {
            Ok((id, slug)) => {
                debug!("Inserted campaign {} as {}", id, slug);
                UpsertOutcome::Inserted { id, slug }
            }
            Err(e) => {
                if let Err(rollback) = self.store.rollback() {
                    warn!("Rollback after failed insert of {} failed: {}", record.url, rollback);
                }
                failed(record, "insert", e.to_string())
            }
        }
    }

    fn insert_then_slug(&mut self, record: &CampaignRecord) -> UpsertOutcome {
        let id = match self.store.insert(record) {
            Ok(id) => id,
            Err(e) => return failed(record, "insert", e.to_string()),
        };

        let slug = campaign_slug(&record.title, id);
        match self.store.set_slug(id, &slug) {
            Ok(()) => {
                debug!("Inserted campaign {} as {}", id, slug);
                UpsertOutcome::Inserted { id, slug }
            }
            Err(e) => {
                warn!(
                    "Campaign {} stored as row {} without a slug ({}); run --backfill-slugs to repair",
                    record.url, id, e
                );
                UpsertOutcome::InsertedWithoutSlug {
                    id,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Rewrites every slug that is missing or does not end in its row's id
    pub fn backfill_missing(&mut self) -> StorageResult<BackfillReport> {
        let candidates = self.store.slug_repair_candidates()?;
        let mut report = BackfillReport::default();

        for row in candidates.iter().filter(|row| needs_repair(row)) {
            report.examined += 1;
            let slug = campaign_slug(&row.title, row.id);
            match self.store.set_slug(row.id, &slug) {
                Ok(()) => {
                    debug!("Backfilled slug {} for campaign {}", slug, row.id);
                    report.repaired += 1;
                }
                Err(e) => {
                    warn!("Could not backfill slug for campaign {}: {}", row.id, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

fn insert_with_slug<S: CampaignStore>(
    store: &mut S,
    record: &CampaignRecord,
) -> StorageResult<(i64, String)> {
    let id = store.insert(record)?;
    let slug = campaign_slug(&record.title, id);
    store.set_slug(id, &slug)?;
    Ok((id, slug))
}

/// A slug needs repair unless it is non-empty and ends in `-<id>`
pub(crate) fn needs_repair(row: &SlugRow) -> bool {
    match row.slug.as_deref() {
        None | Some("") => true,
        Some(slug) => slug_id(slug) != Some(row.id),
    }
}

fn failed(record: &CampaignRecord, step: &str, reason: String) -> UpsertOutcome {
    warn!("Persisting {} failed during {}: {}", record.url, step, reason);
    UpsertOutcome::Failed { reason }
}
