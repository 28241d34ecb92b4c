//! Scripted in-process browser session for crawler tests

use crate::crawler::CampaignRecord;
use crate::session::{BrowserSession, DomQuery, HtmlSnapshot, Locator, SessionError};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// Initial scroll height of every freshly loaded document
pub const INITIAL_HEIGHT: u64 = 1_000;

/// Markup appended by one "load more" trigger
struct Append {
    html: String,
    growth: u64,
}

/// A [`BrowserSession`] that serves canned pages
#[derive(Default)]
pub struct ScriptedSession {
    pages: HashMap<String, String>,
    failures: HashMap<String, u32>,
    appends: VecDeque<Append>,
    current: Option<String>,
    height: u64,
    pub visits: Vec<String>,
    /// When each navigation in `visits` started
    pub visited_at: Vec<Instant>,
    pub clears: u32,
    pub triggers: u32,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    /// Makes the next `times` navigations to `url` fail
    pub fn failing(mut self, url: &str, times: u32) -> Self {
        self.failures.insert(url.to_string(), times);
        self
    }

    /// Queues markup for the next "load more" trigger, growing the page by `growth`
    pub fn with_append(mut self, html: impl Into<String>, growth: u64) -> Self {
        self.appends.push_back(Append {
            html: html.into(),
            growth,
        });
        self
    }
}

/// A listing document with campaign anchors and a "load more" control
pub fn listing_html(hrefs: &[String], with_control: bool) -> String {
    let control = if with_control {
        r#"<a class="more" href="/more">Daha Fazla</a>"#
    } else {
        ""
    };
    format!(
        "<html><body><h2>Kampanyalar</h2>{}{}</body></html>",
        anchors(hrefs),
        control
    )
}

/// Bare campaign anchors, as appended by a "load more" response
pub fn anchors(hrefs: &[String]) -> String {
    hrefs
        .iter()
        .map(|href| format!(r#"<a class="campaign" href="{}">Kampanya</a>"#, href))
        .collect()
}

/// `count` hrefs `/k/<start>`, `/k/<start + 1>`, ...
pub fn hrefs(start: usize, count: usize) -> Vec<String> {
    (start..start + count).map(|i| format!("/k/{}", i)).collect()
}

/// A Paraf campaign record for storage tests
pub fn campaign_record(url: &str, title: &str) -> CampaignRecord {
    CampaignRecord {
        url: url.to_string(),
        title: title.to_string(),
        description: format!("{} detayları", title),
        detail_html: "<p>Kampanya koşulları</p>".to_string(),
        image: Some("https://www.paraf.com.tr/img/kampanya.jpg".to_string()),
        bank: "Halkbank".to_string(),
        card: "Paraf".to_string(),
    }
}

impl BrowserSession for ScriptedSession {
    type Snapshot = HtmlSnapshot;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.visits.push(url.to_string());
        self.visited_at.push(Instant::now());

        if let Some(remaining) = self.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SessionError::Navigation {
                    url: url.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
        }

        match self.pages.get(url) {
            Some(html) => {
                self.current = Some(html.clone());
                self.height = INITIAL_HEIGHT;
                Ok(())
            }
            None => Err(SessionError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn wait_for(&mut self, marker: &Locator, timeout: Duration) -> Result<(), SessionError> {
        if self.dom_snapshot()?.contains(marker) {
            Ok(())
        } else {
            Err(SessionError::Timeout {
                locator: marker.to_string(),
                waited: timeout,
            })
        }
    }

    fn dom_snapshot(&self) -> Result<HtmlSnapshot, SessionError> {
        self.current
            .as_deref()
            .map(HtmlSnapshot::parse)
            .ok_or(SessionError::NoDocument)
    }

    async fn trigger_control(&mut self, _control: &Locator) -> Result<(), SessionError> {
        self.triggers += 1;
        let current = self.current.as_mut().ok_or(SessionError::NoDocument)?;
        if let Some(append) = self.appends.pop_front() {
            current.push_str(&append.html);
            self.height += append.growth;
        }
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn scroll_height(&mut self) -> Result<u64, SessionError> {
        Ok(self.height)
    }

    async fn clear_session(&mut self) -> Result<(), SessionError> {
        self.clears += 1;
        Ok(())
    }
}
