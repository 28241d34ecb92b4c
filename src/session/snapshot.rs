//! Element locators and parsed DOM snapshots

use crate::extract::{collapse_whitespace, Capture};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::fmt;

/// Identifies an element in the page: a CSS selector, optionally narrowed to
/// elements whose text contains a phrase (case-insensitive)
///
/// In TOML a locator is either a bare selector string or a table:
///
/// ```toml
/// ready-marker = "h1"
/// load-more = { selector = "a.btn", text = "DAHA FAZLA" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "LocatorSpec")]
pub struct Locator {
    pub selector: String,
    pub text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocatorSpec {
    Selector(String),
    Full {
        selector: String,
        #[serde(default)]
        text: Option<String>,
    },
}

impl From<LocatorSpec> for Locator {
    fn from(spec: LocatorSpec) -> Self {
        match spec {
            LocatorSpec::Selector(selector) => Locator::new(selector),
            LocatorSpec::Full { selector, text } => Locator { selector, text },
        }
    }
}

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{} containing {:?}", self.selector, text),
            None => write!(f, "{}", self.selector),
        }
    }
}

/// Read-only queries over a DOM snapshot
///
/// Fallback chains only ever talk to this trait, so they can be evaluated
/// against any document model.
pub trait DomQuery {
    /// Captures a value from every element matching `selector`, in document
    /// order. Elements lacking a requested attribute are skipped.
    fn capture_all(&self, selector: &str, capture: &Capture) -> Vec<String>;

    /// Returns true if at least one element matches the locator
    fn contains(&self, locator: &Locator) -> bool;
}

/// A parsed HTML document backed by `scraper`
pub struct HtmlSnapshot {
    document: Html,
}

impl HtmlSnapshot {
    /// Parses a complete HTML document
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Reads an attribute of the first element matching the locator
    pub fn find_attr(&self, locator: &Locator, attr: &str) -> Option<String> {
        self.select(locator)
            .first()
            .and_then(|element| element.value().attr(attr))
            .map(str::to_string)
    }

    fn select<'a>(&'a self, locator: &Locator) -> Vec<ElementRef<'a>> {
        let Some(selector) = parse_selector(&locator.selector) else {
            return Vec::new();
        };

        let needle = locator.text.as_ref().map(|t| t.to_lowercase());
        self.document
            .select(&selector)
            .filter(|element| match &needle {
                Some(needle) => element_text(element).to_lowercase().contains(needle),
                None => true,
            })
            .collect()
    }
}

impl DomQuery for HtmlSnapshot {
    fn capture_all(&self, selector: &str, capture: &Capture) -> Vec<String> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };

        self.document
            .select(&selector)
            .filter_map(|element| match capture {
                Capture::Text => Some(element_text(&element)),
                Capture::InnerHtml => Some(element.inner_html()),
                Capture::OuterHtml => Some(element.html()),
                Capture::Attr(name) => element.value().attr(name).map(str::to_string),
            })
            .collect()
    }

    fn contains(&self, locator: &Locator) -> bool {
        !self.select(locator).is_empty()
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Ignoring invalid selector '{}': {:?}", selector, e);
            None
        }
    }
}

/// Text content with a space between text nodes, whitespace collapsed
fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}
