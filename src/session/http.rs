//! HTTP-backed browser session
//!
//! `HttpSession` fetches pages with `reqwest`, either directly or through a
//! Browserless-compatible `/content` endpoint that returns the rendered DOM.
//! A "load more" control is followed by fetching its target and appending
//! the returned markup to the current document, which is what a click does
//! to the DOM in a real browser.

use super::{BrowserSession, DomQuery, HtmlSnapshot, Locator, SessionError};
use crate::config::SessionConfig;
use crate::url::resolve_link;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds the HTTP client used by [`HttpSession`]
///
/// The client keeps a cookie jar so session cookies survive between
/// requests until [`BrowserSession::clear_session`] drops them.
///
/// # Arguments
///
/// * `config` - The session configuration
pub fn build_http_client(config: &SessionConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// The document currently loaded in the session
struct Page {
    url: Url,
    html: String,
}

pub struct HttpSession {
    config: SessionConfig,
    render_token: Option<String>,
    client: Client,
    page: Option<Page>,
}

impl HttpSession {
    /// Creates a session from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Session settings (user agent, timeout, optional renderer)
    /// * `render_token` - Access token for the render endpoint, if any
    pub fn new(config: &SessionConfig, render_token: Option<String>) -> Result<Self, SessionError> {
        let client =
            build_http_client(config).map_err(|e| SessionError::Client(e.to_string()))?;

        Ok(Self {
            config: config.clone(),
            render_token,
            client,
            page: None,
        })
    }

    /// Whether pages are fetched through the render endpoint
    pub fn is_rendering(&self) -> bool {
        self.config.render_endpoint.is_some()
    }

    /// The render endpoint's `/content` URL with the token as a query pair
    fn content_url(&self, endpoint: &str) -> Result<Url, SessionError> {
        let mut content_url = Url::parse(&format!("{}/content", endpoint.trim_end_matches('/')))
            .map_err(|e| SessionError::Client(format!("bad render endpoint: {}", e)))?;
        if let Some(token) = &self.render_token {
            content_url.query_pairs_mut().append_pair("token", token);
        }
        Ok(content_url)
    }

    /// Fetches `url`, through the render endpoint when one is configured
    ///
    /// With `wait`, the renderer is asked to hold the response until the
    /// selector appears or the timeout runs out. Direct fetches ignore it.
    async fn fetch(
        &self,
        url: &str,
        wait: Option<(&Locator, Duration)>,
    ) -> Result<String, SessionError> {
        let request = match &self.config.render_endpoint {
            Some(endpoint) => {
                let mut body = serde_json::json!({ "url": url });
                if let Some((marker, timeout)) = wait {
                    body["waitForSelector"] = serde_json::json!({
                        "selector": marker.selector,
                        "timeout": timeout.as_millis() as u64,
                    });
                }
                self.client.post(self.content_url(endpoint)?).json(&body)
            }
            None => self.client.get(url),
        };

        let response = request.send().await.map_err(|e| SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn page(&self) -> Result<&Page, SessionError> {
        self.page.as_ref().ok_or(SessionError::NoDocument)
    }
}

impl BrowserSession for HttpSession {
    type Snapshot = HtmlSnapshot;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        let parsed = Url::parse(url).map_err(|e| SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!("GET {}", url);
        let html = self.fetch(url, None).await?;
        self.page = Some(Page { url: parsed, html });
        Ok(())
    }

    /// A directly fetched document never changes, so a missing marker fails
    /// at once. A rendered page is requested again with the marker and
    /// `timeout` handed to the renderer.
    async fn wait_for(&mut self, marker: &Locator, timeout: Duration) -> Result<(), SessionError> {
        if self.dom_snapshot()?.contains(marker) {
            return Ok(());
        }

        let mut waited = Duration::ZERO;
        if self.is_rendering() {
            let url = self.page()?.url.to_string();
            tracing::debug!("Rendering {} again until {} appears", url, marker);
            let html = self.fetch(&url, Some((marker, timeout))).await?;
            let page = self.page.as_mut().ok_or(SessionError::NoDocument)?;
            page.html = html;
            waited = timeout;

            if self.dom_snapshot()?.contains(marker) {
                return Ok(());
            }
        }

        Err(SessionError::Timeout {
            locator: marker.to_string(),
            waited,
        })
    }

    fn dom_snapshot(&self) -> Result<HtmlSnapshot, SessionError> {
        Ok(HtmlSnapshot::parse(&self.page()?.html))
    }

    async fn trigger_control(&mut self, control: &Locator) -> Result<(), SessionError> {
        let not_actionable = || SessionError::ControlNotActionable {
            locator: control.to_string(),
        };

        let snapshot = self.dom_snapshot()?;
        let href = snapshot
            .find_attr(control, "data-href")
            .or_else(|| snapshot.find_attr(control, "href"))
            .ok_or_else(not_actionable)?;
        drop(snapshot);

        let target = resolve_link(&href, &self.page()?.url).ok_or_else(not_actionable)?;

        tracing::debug!("Following {} to {}", control, target);
        let more = self.fetch(target.as_str(), None).await?;

        let page = self.page.as_mut().ok_or(SessionError::NoDocument)?;
        page.html.push_str(&more);
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.page().map(|_| ())
    }

    async fn scroll_height(&mut self) -> Result<u64, SessionError> {
        Ok(self.page()?.html.len() as u64)
    }

    async fn clear_session(&mut self) -> Result<(), SessionError> {
        self.client =
            build_http_client(&self.config).map_err(|e| SessionError::Client(e.to_string()))?;
        self.page = None;
        Ok(())
    }
}
