//! The harvesting run
//!
//! A run crawls the listing once, then visits every discovered link in
//! discovery order. Each link is handled inside its own error boundary: a
//! failed page is logged and counted, and the run moves on to the next
//! link. Accepted records go to the JSON artifact and the database
//! independently, so a failure in one sink never blocks the other.

use super::dedup::Deduplicator;
use super::detail::DetailExtractor;
use super::listing::{ListCrawler, StopReason};
use super::pacing::Pacer;
use super::retry::RetryPolicy;
use super::{CampaignLink, CampaignRecord, CrawlError};
use crate::config::Config;
use crate::output::IncrementalWriter;
use crate::session::{BrowserSession, HttpSession};
use crate::storage::{
    CampaignStore, RunCounts, RunStatus, RunStore, SlugUpsertCoordinator, SqliteStorage,
    UpsertOutcome,
};
use crate::SieveError;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

/// Environment variable holding the render endpoint's API token
pub const RENDER_TOKEN_ENV: &str = "BROWSERLESS_TOKEN";

/// Counts gathered over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Unique links the listing produced
    pub discovered: usize,
    /// Links dropped because their URL was already stored
    pub skipped: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Fields that fell back to a default
    pub fallbacks: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Rows stored without a slug
    pub missing_slug: usize,
    pub persist_failed: usize,
    pub artifact_failures: usize,
    pub stop_reason: Option<StopReason>,
}

impl RunSummary {
    pub fn record_outcome(&mut self, outcome: &UpsertOutcome) {
        match outcome {
            UpsertOutcome::Updated { .. } => self.updated += 1,
            UpsertOutcome::Inserted { .. } => self.inserted += 1,
            UpsertOutcome::InsertedWithoutSlug { .. } => self.missing_slug += 1,
            UpsertOutcome::Failed { .. } => self.persist_failed += 1,
        }
    }

    /// The counts stored in the run ledger
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            links_found: self.discovered,
            processed: self.processed,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

/// Drives one harvesting run for a site
pub struct Pipeline<S: BrowserSession, St: CampaignStore + RunStore> {
    config: Config,
    base_url: Url,
    config_hash: String,
    session: S,
    retry: RetryPolicy,
    pacer: Pacer,
    writer: Option<IncrementalWriter>,
    upserter: Option<SlugUpsertCoordinator<St>>,
}

impl Pipeline<HttpSession, SqliteStorage> {
    /// Builds the session and opens the database named by the configuration
    ///
    /// Failing to build the session or to open the database is fatal.
    pub fn from_config(config: Config, config_hash: String) -> Result<Self, SieveError> {
        let token = std::env::var(RENDER_TOKEN_ENV).ok().filter(|token| !token.is_empty());
        let has_token = token.is_some();

        let session =
            HttpSession::new(&config.session, token).map_err(CrawlError::SessionUnavailable)?;
        if session.is_rendering() {
            info!("Fetching pages through the render endpoint");
            if !has_token {
                warn!(
                    "{} is not set; render endpoint requests will not be authenticated",
                    RENDER_TOKEN_ENV
                );
            }
        }
        let storage = match config.output.database_path.as_deref() {
            Some(path) => Some(SqliteStorage::new(Path::new(path))?),
            None => None,
        };

        Self::new(config, config_hash, session, storage)
    }
}

impl<S: BrowserSession, St: CampaignStore + RunStore> Pipeline<S, St> {
    pub fn new(
        config: Config,
        config_hash: String,
        session: S,
        storage: Option<St>,
    ) -> Result<Self, SieveError> {
        let base_url = Url::parse(&config.site.base_url)?;
        let retry = RetryPolicy::from_config(&config.retry);
        let pacer = Pacer::from_config(&config.politeness);
        let writer = config.output.json_path.as_deref().map(IncrementalWriter::new);
        let upserter = storage.map(SlugUpsertCoordinator::new);

        Ok(Self {
            config,
            base_url,
            config_hash,
            session,
            retry,
            pacer,
            writer,
            upserter,
        })
    }

    /// Runs the crawl and processes every discovered link
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of links to process; overrides the
    ///   configured `listing.limit`
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run finished; per-link failures are counted
    ///   in the summary
    /// * `Err(SieveError)` - The run ledger could not be started
    pub async fn run(&mut self, limit: Option<usize>) -> Result<RunSummary, SieveError> {
        let limit = limit.or(self.config.listing.limit);
        let run_id = match self.upserter.as_mut() {
            Some(upserter) => Some(
                upserter
                    .store_mut()
                    .create_run(&self.config.site.name, &self.config_hash)?,
            ),
            None => None,
        };

        info!(
            "Harvesting {} ({} / {}){}",
            self.config.site.name,
            self.config.site.bank,
            self.config.site.card,
            limit.map(|n| format!(", limit {}", n)).unwrap_or_default()
        );

        let mut summary = RunSummary::default();
        let skip_existing = self.config.output.skip_existing && self.upserter.is_some();
        // Stored links must not use up the limit, so they are filtered first
        let crawl_limit = if skip_existing { None } else { limit };

        let mut dedup = Deduplicator::new();
        let report = ListCrawler::new(
            &mut self.session,
            &self.config.listing,
            &self.base_url,
            &self.retry,
            &self.pacer,
        )
        .crawl(&mut dedup, crawl_limit)
        .await;

        summary.discovered = report.links.len();
        summary.stop_reason = Some(report.stop_reason);
        let listing_failed =
            report.links.is_empty() && report.stop_reason == StopReason::TooManyFailures;

        let links = self.select_links(report.links, skip_existing, limit, &mut summary);
        let total = links.len();

        for (i, link) in links.iter().enumerate() {
            self.pacer.pause().await;
            summary.processed += 1;

            let result = DetailExtractor::new(
                &mut self.session,
                &self.config.detail,
                &self.config.site,
                &self.base_url,
                &self.retry,
            )
            .extract(link)
            .await;

            match result {
                Ok(extraction) => {
                    summary.succeeded += 1;
                    summary.fallbacks += extraction.fallbacks.len();
                    info!("[{}/{}] ✓ {}", i + 1, total, link.url);
                    self.persist(extraction.record, &mut summary);
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("[{}/{}] ✗ {}: {}", i + 1, total, link.url, e);
                }
            }
        }

        if let Some(writer) = &self.writer {
            if writer.is_empty() {
                info!("No record was accepted; writing an empty {}", writer.path().display());
            }
            if let Err(e) = writer.finish() {
                summary.artifact_failures += 1;
                warn!("Failed to write {}: {}", writer.path().display(), e);
            } else {
                info!("Wrote {} record(s) to {}", writer.len(), writer.path().display());
            }
        }

        if let (Some(run_id), Some(upserter)) = (run_id, self.upserter.as_mut()) {
            let status = if listing_failed {
                RunStatus::Failed
            } else {
                RunStatus::Completed
            };
            if let Err(e) = upserter.store_mut().complete_run(run_id, status, &summary.counts()) {
                warn!("Failed to record the end of run {}: {}", run_id, e);
            }
        }

        info!(
            "Run finished: {} processed, {} succeeded, {} failed",
            summary.processed, summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    /// Drops already-stored links when asked to, then applies the limit
    fn select_links(
        &self,
        links: Vec<CampaignLink>,
        skip_existing: bool,
        limit: Option<usize>,
        summary: &mut RunSummary,
    ) -> Vec<CampaignLink> {
        let mut selected: Vec<CampaignLink> = match (&self.upserter, skip_existing) {
            (Some(upserter), true) => links
                .into_iter()
                .filter(|link| match upserter.is_known(&link.url) {
                    Ok(known) => {
                        if known {
                            summary.skipped += 1;
                        }
                        !known
                    }
                    Err(e) => {
                        warn!("Could not check whether {} is stored: {}", link.url, e);
                        true
                    }
                })
                .collect(),
            _ => links,
        };

        if summary.skipped > 0 {
            info!("Skipping {} already stored campaign(s)", summary.skipped);
        }
        if let Some(limit) = limit {
            selected.truncate(limit);
        }
        selected
    }

    /// Hands a record to every configured sink
    fn persist(&mut self, record: CampaignRecord, summary: &mut RunSummary) {
        if let Some(upserter) = self.upserter.as_mut() {
            let outcome = upserter.upsert(&record);
            summary.record_outcome(&outcome);
        }

        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.push(record) {
                summary.artifact_failures += 1;
                warn!("Failed to update {}: {}", writer.path().display(), e);
            }
        }
    }
}
