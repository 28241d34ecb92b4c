//! Browser session abstraction
//!
//! The pipeline owns exactly one [`BrowserSession`] for the whole run and
//! drives it strictly sequentially. Everything that reads page content goes
//! through a [`DomQuery`] snapshot taken from the session, so the crawler and
//! extractor never depend on a concrete browser or parser.

mod http;
mod snapshot;

pub use http::{build_http_client, HttpSession};
pub use snapshot::{DomQuery, HtmlSnapshot, Locator};

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a browser session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Network-level failure while loading a page; retryable
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// A readiness marker did not appear in time
    #[error("Timed out after {waited:?} waiting for {locator}")]
    Timeout { locator: String, waited: Duration },

    #[error("Control {locator} could not be triggered")]
    ControlNotActionable { locator: String },

    #[error("No document has been loaded")]
    NoDocument,

    #[error("Failed to set up browser session: {0}")]
    Client(String),
}

impl SessionError {
    /// Whether the error means the page itself never became usable,
    /// as opposed to a transient network failure
    pub fn is_content_missing(&self) -> bool {
        matches!(self, SessionError::Timeout { .. } | SessionError::NoDocument)
    }
}

/// The browser capabilities the crawler and extractor rely on
///
/// Implementations are driven by a single owner; no method is ever called
/// concurrently with another.
#[allow(async_fn_in_trait)]
pub trait BrowserSession {
    type Snapshot: DomQuery;

    /// Loads `url` as the current document
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Waits up to `timeout` for `marker` to be present in the current document
    async fn wait_for(&mut self, marker: &Locator, timeout: Duration) -> Result<(), SessionError>;

    /// Takes a read-only snapshot of the current document
    fn dom_snapshot(&self) -> Result<Self::Snapshot, SessionError>;

    /// Activates a control such as a "load more" button
    async fn trigger_control(&mut self, control: &Locator) -> Result<(), SessionError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError>;

    /// Current scroll height of the document; grows as content is appended
    async fn scroll_height(&mut self) -> Result<u64, SessionError>;

    /// Drops cookies and other transient state before a retry
    async fn clear_session(&mut self) -> Result<(), SessionError>;
}
