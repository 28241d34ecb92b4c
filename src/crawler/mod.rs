//! Campaign harvesting pipeline
//!
//! This module contains the harvesting stages, including:
//! - Link discovery over paged or infinite-scroll listings
//! - Per-run deduplication of campaign links
//! - Detail page extraction with retries and field fallbacks
//! - Politeness pacing between requests
//! - The pipeline that drives a run and isolates per-link failures

mod dedup;
mod detail;
mod listing;
mod pacing;
mod pipeline;
mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use dedup::Deduplicator;
pub use detail::{DetailExtractor, Extraction, ExtractionError, ExtractionResult, Field};
pub use listing::{CrawlReport, ListCrawler, StopReason};
pub use pacing::{Pacer, MIN_DELAY_FLOOR};
pub use pipeline::{Pipeline, RunSummary, RENDER_TOKEN_ENV};
pub use retry::{Backoff, PageLoad, RetryError, RetryPolicy, SessionTask};

use crate::session::SessionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run-fatal crawl errors
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Browser session unavailable: {0}")]
    SessionUnavailable(#[source] SessionError),
}

/// A campaign detail page found on the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignLink {
    /// Absolute, canonical URL
    pub url: String,
    /// Position in discovery order
    pub index: usize,
}

/// The uniform record extracted from one campaign page
///
/// This is also the element type of the JSON artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Reference URL; equals the link the record came from
    pub url: String,
    pub title: String,
    pub description: String,
    /// Raw markup of the campaign's detail section
    pub detail_html: String,
    pub image: Option<String>,
    pub bank: String,
    pub card: String,
}
