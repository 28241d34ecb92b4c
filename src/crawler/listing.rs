//! Campaign link discovery
//!
//! Two strategies share one harvesting step:
//!
//! - **Paged**: substitute an increasing page index into the URL template,
//!   load each page and harvest its links. An empty page ends the crawl.
//! - **Infinite scroll**: load the listing once, then repeat scroll-to-bottom
//!   and "load more" cycles, harvesting after each. The crawl ends when the
//!   control disappears or the page stops growing.
//!
//! Either way the crawl also ends when an iteration adds no new links, the
//! iteration budget runs out, or `limit` links have been collected. A failed
//! iteration is logged and skipped; only a run of consecutive failures ends
//! the crawl early.

use super::dedup::Deduplicator;
use super::pacing::Pacer;
use super::retry::{PageLoad, RetryPolicy};
use super::CampaignLink;
use crate::config::{ListingConfig, ListingMode};
use crate::extract::resolve_all;
use crate::session::{BrowserSession, DomQuery, SessionError};
use crate::url::resolve_link;
use std::fmt;
use std::time::Duration;
use url::Url;

/// How long to wait for the listing's optional readiness marker
const LISTING_READY_TIMEOUT: Duration = Duration::from_secs(15);

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    LimitReached,
    EmptyPage,
    NoNewLinks,
    HeightStalled,
    ControlGone,
    MaxIterations,
    TooManyFailures,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::LimitReached => "link limit reached",
            StopReason::EmptyPage => "empty listing page",
            StopReason::NoNewLinks => "no new links",
            StopReason::HeightStalled => "page stopped growing",
            StopReason::ControlGone => "load-more control disappeared",
            StopReason::MaxIterations => "iteration limit reached",
            StopReason::TooManyFailures => "too many consecutive failures",
        };
        f.write_str(text)
    }
}

/// Outcome of a listing crawl
#[derive(Debug)]
pub struct CrawlReport {
    /// Unique campaign links in discovery order
    pub links: Vec<CampaignLink>,
    /// Pages fetched (paged) or scroll cycles run (infinite scroll)
    pub iterations: u32,
    pub failed_iterations: u32,
    pub stop_reason: StopReason,
}

/// Links found by one harvesting pass
struct Harvest {
    found: usize,
    new: usize,
}

/// Result of one scroll cycle
enum Cycle {
    Height(u64),
    ControlGone,
}

/// Discovers campaign links on a listing
pub struct ListCrawler<'a, S: BrowserSession> {
    session: &'a mut S,
    config: &'a ListingConfig,
    base_url: &'a Url,
    retry: &'a RetryPolicy,
    pacer: &'a Pacer,
}

impl<'a, S: BrowserSession> ListCrawler<'a, S> {
    pub fn new(
        session: &'a mut S,
        config: &'a ListingConfig,
        base_url: &'a Url,
        retry: &'a RetryPolicy,
        pacer: &'a Pacer,
    ) -> Self {
        Self {
            session,
            config,
            base_url,
            retry,
            pacer,
        }
    }

    /// Crawls the listing and returns the unique links it found
    ///
    /// # Arguments
    ///
    /// * `dedup` - The run's seen-set; links already in it are not returned
    /// * `limit` - Stop once this many links have been collected
    pub async fn crawl(&mut self, dedup: &mut Deduplicator, limit: Option<usize>) -> CrawlReport {
        let report = match self.config.mode {
            ListingMode::Paged => self.crawl_paged(dedup, limit).await,
            ListingMode::InfiniteScroll => self.crawl_infinite_scroll(dedup, limit).await,
        };

        tracing::info!(
            "Listing crawl finished: {} link(s) in {} iteration(s), stopped: {}",
            report.links.len(),
            report.iterations,
            report.stop_reason
        );
        report
    }

    async fn crawl_paged(&mut self, dedup: &mut Deduplicator, limit: Option<usize>) -> CrawlReport {
        let config = self.config;
        let template = config.url_template.as_deref().unwrap_or_default();
        let mut links = Vec::new();
        let mut page = config.start_page;
        let mut iterations = 0;
        let mut failures = 0;
        let mut failed_iterations = 0;

        let stop_reason = loop {
            if limit_reached(links.len(), limit) {
                break StopReason::LimitReached;
            }
            if iterations >= self.config.max_iterations {
                break StopReason::MaxIterations;
            }
            if iterations > 0 {
                self.pacer.pause().await;
            }
            iterations += 1;

            let url = template.replace("{page}", &page.to_string());
            match self.load_and_harvest(&url, dedup, &mut links, limit).await {
                Ok(harvest) => {
                    failures = 0;
                    tracing::info!(
                        "Listing page {}: {} link(s), {} new, {} total",
                        page,
                        harvest.found,
                        harvest.new,
                        links.len()
                    );
                    if harvest.found == 0 {
                        break StopReason::EmptyPage;
                    }
                    if harvest.new == 0 {
                        break StopReason::NoNewLinks;
                    }
                }
                Err(e) => {
                    failures += 1;
                    failed_iterations += 1;
                    tracing::warn!("Listing page {} failed: {}", url, e);
                    if failures >= self.config.max_consecutive_failures {
                        break StopReason::TooManyFailures;
                    }
                }
            }
            page += 1;
        };

        CrawlReport {
            links,
            iterations,
            failed_iterations,
            stop_reason,
        }
    }

    async fn crawl_infinite_scroll(
        &mut self,
        dedup: &mut Deduplicator,
        limit: Option<usize>,
    ) -> CrawlReport {
        let config = self.config;
        let url = config.url.as_deref().unwrap_or_default();
        let mut links = Vec::new();
        let mut iterations = 0;
        let mut failures = 0;
        let mut failed_iterations = 0;

        loop {
            match self.load_and_harvest(url, dedup, &mut links, limit).await {
                Ok(harvest) => {
                    tracing::info!("Listing loaded: {} link(s)", harvest.found);
                    break;
                }
                Err(e) => {
                    failures += 1;
                    failed_iterations += 1;
                    tracing::warn!("Listing {} failed to load: {}", url, e);
                    if failures >= self.config.max_consecutive_failures {
                        return CrawlReport {
                            links,
                            iterations,
                            failed_iterations,
                            stop_reason: StopReason::TooManyFailures,
                        };
                    }
                    self.pacer.pause().await;
                }
            }
        }

        failures = 0;
        let mut last_height = self.session.scroll_height().await.unwrap_or(0);

        let stop_reason = loop {
            if limit_reached(links.len(), limit) {
                break StopReason::LimitReached;
            }
            if iterations >= self.config.max_iterations {
                break StopReason::MaxIterations;
            }
            iterations += 1;

            let outcome = match self.scroll_cycle().await {
                Ok(Cycle::ControlGone) => {
                    if let Err(e) = self.harvest(dedup, &mut links, limit) {
                        tracing::debug!("Final harvest failed: {}", e);
                    }
                    break StopReason::ControlGone;
                }
                Ok(Cycle::Height(height)) => self
                    .harvest(dedup, &mut links, limit)
                    .map(|harvest| (harvest, height)),
                Err(e) => Err(e),
            };

            match outcome {
                Ok((harvest, height)) => {
                    failures = 0;
                    tracing::info!(
                        "Scroll cycle {}: {} new link(s), {} total, height {}",
                        iterations,
                        harvest.new,
                        links.len(),
                        height
                    );
                    if harvest.new == 0 {
                        break StopReason::NoNewLinks;
                    }
                    if height <= last_height {
                        break StopReason::HeightStalled;
                    }
                    last_height = height;
                }
                Err(e) => {
                    failures += 1;
                    failed_iterations += 1;
                    tracing::warn!("Scroll cycle {} failed: {}", iterations, e);
                    if failures >= self.config.max_consecutive_failures {
                        break StopReason::TooManyFailures;
                    }
                }
            }
        };

        CrawlReport {
            links,
            iterations,
            failed_iterations,
            stop_reason,
        }
    }

    /// Scrolls to the bottom and triggers the "load more" control if present
    async fn scroll_cycle(&mut self) -> Result<Cycle, SessionError> {
        self.session.scroll_to_bottom().await?;
        self.pacer.pause().await;

        if let Some(control) = &self.config.load_more {
            let visible = self.session.dom_snapshot()?.contains(control);
            if !visible {
                tracing::debug!("Control {} is gone", control);
                return Ok(Cycle::ControlGone);
            }
            self.session.trigger_control(control).await?;
            self.pacer.pause().await;
        }

        Ok(Cycle::Height(self.session.scroll_height().await?))
    }

    async fn load_and_harvest(
        &mut self,
        url: &str,
        dedup: &mut Deduplicator,
        links: &mut Vec<CampaignLink>,
        limit: Option<usize>,
    ) -> Result<Harvest, SessionError> {
        self.retry
            .run(self.session, &mut PageLoad::new(url))
            .await
            .map_err(|e| e.last)?;

        if let Some(marker) = &self.config.ready_marker {
            if let Err(e) = self.session.wait_for(marker, LISTING_READY_TIMEOUT).await {
                tracing::debug!("Listing ready marker not seen on {}: {}", url, e);
            }
        }

        self.harvest(dedup, links, limit)
    }

    /// Adds every new link in the current document, up to `limit`
    fn harvest(
        &self,
        dedup: &mut Deduplicator,
        links: &mut Vec<CampaignLink>,
        limit: Option<usize>,
    ) -> Result<Harvest, SessionError> {
        let snapshot = self.session.dom_snapshot()?;
        let hrefs = resolve_all(&self.config.links, &snapshot, self.base_url);

        let mut new = 0;
        for href in &hrefs {
            if limit_reached(links.len(), limit) {
                break;
            }

            let Some(url) = resolve_link(href, self.base_url) else {
                tracing::debug!("Skipping unusable href '{}'", href);
                continue;
            };

            if dedup.add(url.as_str()) {
                links.push(CampaignLink {
                    url: url.to_string(),
                    index: links.len(),
                });
                new += 1;
            }
        }

        Ok(Harvest {
            found: hrefs.len(),
            new,
        })
    }
}

fn limit_reached(count: usize, limit: Option<usize>) -> bool {
    limit.is_some_and(|limit| count >= limit)
}
