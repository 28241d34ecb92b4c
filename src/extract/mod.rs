//! Field extraction through ordered selector fallback chains
//!
//! A fallback chain is a list of [`Matcher`]s. Each matcher names a CSS
//! selector, what to capture from the matched elements, transforms to apply,
//! and validity predicates. The resolver functions are pure: a fixed chain
//! and snapshot always yield the same value.

mod matcher;
mod resolver;

pub use matcher::{collapse_whitespace, Capture, Matcher, Transform};
pub use resolver::{resolve, resolve_all, resolve_with};
