//! Selector matchers: capture mode, transforms and validity predicates

use crate::url::resolve_url;
use serde::Deserialize;
use url::Url;

/// What a matcher reads from each element its selector matches
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capture {
    /// Whitespace-normalised text content
    #[default]
    Text,
    InnerHtml,
    OuterHtml,
    /// Value of the named attribute; elements without it are skipped
    Attr(String),
}

/// A step applied to a captured value before the validity predicates run
///
/// A transform that cannot apply (no `url(...)` in the value, an
/// unresolvable URL) discards the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transform {
    Trim,
    CollapseWhitespace,
    /// Extracts the target of the first CSS `url(...)` in the value
    CssUrl,
    /// Resolves the value against the site base URL
    ResolveUrl,
    /// Keeps at most N characters
    Truncate(usize),
}

impl Transform {
    fn apply(&self, value: String, base_url: &Url) -> Option<String> {
        match self {
            Transform::Trim => Some(value.trim().to_string()),
            Transform::CollapseWhitespace => Some(collapse_whitespace(&value)),
            Transform::CssUrl => css_url(&value),
            Transform::ResolveUrl => resolve_url(&value, base_url),
            Transform::Truncate(max) => Some(value.chars().take(*max).collect()),
        }
    }
}

/// One strategy in a fallback chain: locator, transform, validity predicate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Matcher {
    /// CSS selector evaluated against the DOM snapshot
    pub selector: String,

    #[serde(default)]
    pub capture: Capture,

    #[serde(default)]
    pub transforms: Vec<Transform>,

    /// Joins the first N captured values into a single candidate
    #[serde(default)]
    pub join: Option<usize>,

    /// The value must contain at least one of these substrings
    #[serde(default)]
    pub require_any: Vec<String>,

    /// The value must contain none of these substrings
    #[serde(default)]
    pub reject: Vec<String>,

    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

fn default_min_length() -> usize {
    1
}

impl Matcher {
    /// Creates a text matcher for the given selector
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            capture: Capture::Text,
            transforms: Vec::new(),
            join: None,
            require_any: Vec::new(),
            reject: Vec::new(),
            min_length: default_min_length(),
        }
    }

    /// Creates a matcher that captures the named attribute
    pub fn attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::new(selector).with_capture(Capture::Attr(attr.into()))
    }

    #[must_use]
    pub fn with_capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    #[must_use]
    pub fn with_join(mut self, count: usize) -> Self {
        self.join = Some(count);
        self
    }

    #[must_use]
    pub fn with_require_any<I, T>(mut self, needles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.require_any = needles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_reject<I, T>(mut self, needles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.reject = needles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    /// Runs the transforms over a captured value
    ///
    /// The result is always trimmed; None means the candidate was discarded.
    pub fn transform(&self, value: String, base_url: &Url) -> Option<String> {
        let mut value = value;
        for transform in &self.transforms {
            value = transform.apply(value, base_url)?;
        }
        Some(value.trim().to_string())
    }

    /// Checks a transformed value against the validity predicates
    pub fn accepts(&self, value: &str) -> bool {
        if value.chars().count() < self.min_length {
            return false;
        }

        let lowered = value.to_lowercase();
        if !self.require_any.is_empty()
            && !self
                .require_any
                .iter()
                .any(|needle| lowered.contains(&needle.to_lowercase()))
        {
            return false;
        }

        !self
            .reject
            .iter()
            .any(|needle| lowered.contains(&needle.to_lowercase()))
    }
}

/// Collapses every whitespace run to a single space and trims the ends
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pulls the target out of the first CSS `url(...)` in a style value
fn css_url(value: &str) -> Option<String> {
    let start = value.find("url(")? + "url(".len();
    let rest = &value[start..];
    let end = rest.find(')')?;
    let target = rest[..end].trim().trim_matches(|c| c == '"' || c == '\'');

    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}
