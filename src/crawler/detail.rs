//! Campaign detail page extraction
//!
//! Loads one campaign page under the retry policy, waits for its ready
//! marker and resolves every record field through its fallback chain.

use super::retry::{PageLoad, RetryPolicy};
use super::{CampaignLink, CampaignRecord};
use crate::config::{DetailConfig, SiteConfig};
use crate::extract::{resolve, resolve_with, Matcher};
use crate::session::{BrowserSession, DomQuery};
use crate::url::resolve_url;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Terminal failure for a single campaign link
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The page never loaded or its readiness marker never appeared
    #[error("Content missing at {url} after {attempts} attempt(s): {reason}")]
    ContentMissing {
        url: String,
        attempts: u32,
        reason: String,
    },
}

/// Record fields filled from fallback chains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Image,
    Content,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Image => "image",
            Field::Content => "content",
        };
        f.write_str(name)
    }
}

/// A successfully extracted record
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: CampaignRecord,
    /// Fields whose configured chain was exhausted and fell back to a default
    pub fallbacks: Vec<Field>,
    /// Page load attempts it took
    pub attempts: u32,
}

pub type ExtractionResult = Result<Extraction, ExtractionError>;

/// Turns a campaign detail page into a [`CampaignRecord`]
pub struct DetailExtractor<'a, S: BrowserSession> {
    session: &'a mut S,
    config: &'a DetailConfig,
    site: &'a SiteConfig,
    base_url: &'a Url,
    retry: &'a RetryPolicy,
}

impl<'a, S: BrowserSession> DetailExtractor<'a, S> {
    pub fn new(
        session: &'a mut S,
        config: &'a DetailConfig,
        site: &'a SiteConfig,
        base_url: &'a Url,
        retry: &'a RetryPolicy,
    ) -> Self {
        Self {
            session,
            config,
            site,
            base_url,
            retry,
        }
    }

    /// Loads the link's page and extracts a record from it
    ///
    /// Loading (navigation plus waiting for the readiness marker) runs under
    /// the retry policy. Once the page is loaded every field has a value:
    /// exhausted chains fall back to configured defaults.
    pub async fn extract(&mut self, link: &CampaignLink) -> ExtractionResult {
        let config = self.config;
        let timeout = Duration::from_millis(config.ready_timeout_ms);
        let mut load = PageLoad::new(&link.url).ready_when(&config.ready_marker, timeout);

        let (_, attempts) = self
            .retry
            .run(self.session, &mut load)
            .await
            .map_err(|e| ExtractionError::ContentMissing {
                url: link.url.clone(),
                attempts: e.attempts,
                reason: if e.last.is_content_missing() {
                    format!("page never became ready ({})", e.last)
                } else {
                    e.last.to_string()
                },
            })?;

        let snapshot =
            self.session
                .dom_snapshot()
                .map_err(|e| ExtractionError::ContentMissing {
                    url: link.url.clone(),
                    attempts,
                    reason: e.to_string(),
                })?;

        let (record, fallbacks) = self.build_record(link, &snapshot);
        Ok(Extraction {
            record,
            fallbacks,
            attempts,
        })
    }

    /// Resolves every field against a loaded document
    fn build_record<D: DomQuery>(
        &self,
        link: &CampaignLink,
        dom: &D,
    ) -> (CampaignRecord, Vec<Field>) {
        let config = self.config;
        let mut fallbacks = Vec::new();

        let title = self
            .field(link, Field::Title, &config.title, dom, &mut fallbacks)
            .unwrap_or_else(|| config.default_title.clone());

        let description = self
            .field(link, Field::Description, &config.description, dom, &mut fallbacks)
            .unwrap_or_else(|| title.clone());

        let image = self.image(link, dom, &mut fallbacks);

        let detail_html = self
            .field(link, Field::Content, &config.content, dom, &mut fallbacks)
            .unwrap_or_default();

        let record = CampaignRecord {
            url: link.url.clone(),
            title,
            description,
            detail_html,
            image,
            bank: self.site.bank.clone(),
            card: self.site.card.clone(),
        };
        (record, fallbacks)
    }

    fn field<D: DomQuery>(
        &self,
        link: &CampaignLink,
        field: Field,
        chain: &[Matcher],
        dom: &D,
        fallbacks: &mut Vec<Field>,
    ) -> Option<String> {
        let value = resolve(chain, dom, self.base_url);
        if value.is_none() {
            note_exhausted(link, field, chain, fallbacks);
        }
        value
    }

    /// First image that resolves to an absolute URL and is not denylisted
    fn image<D: DomQuery>(
        &self,
        link: &CampaignLink,
        dom: &D,
        fallbacks: &mut Vec<Field>,
    ) -> Option<String> {
        let chain = &self.config.image;
        let found = resolve_with(chain, dom, self.base_url, |value| {
            resolve_url(value, self.base_url).is_some_and(|url| !self.is_denied(&url))
        })
        .and_then(|value| resolve_url(&value, self.base_url));

        if found.is_some() {
            return found;
        }

        note_exhausted(link, Field::Image, chain, fallbacks);
        self.config
            .default_image
            .as_deref()
            .and_then(|image| resolve_url(image, self.base_url))
    }

    fn is_denied(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        self.config
            .image_denylist
            .iter()
            .any(|marker| lowered.contains(&marker.to_lowercase()))
    }
}

/// Records a field fallback; unconfigured chains fall back silently
fn note_exhausted(
    link: &CampaignLink,
    field: Field,
    chain: &[Matcher],
    fallbacks: &mut Vec<Field>,
) {
    if chain.is_empty() {
        return;
    }
    tracing::warn!("{}: no {} matched, using default", link.url, field);
    fallbacks.push(field);
}
