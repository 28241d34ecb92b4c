//! Per-run URL deduplication

use std::collections::HashSet;

/// Remembers which campaign URLs were already seen in this run
///
/// URLs are expected in canonical form (see [`crate::url::canonicalize_link`]),
/// so the set compares them as plain strings.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url`; returns true if it had not been seen before
    pub fn add(&mut self, url: &str) -> bool {
        if self.seen.contains(url) {
            return false;
        }
        self.seen.insert(url.to_string())
    }
}
