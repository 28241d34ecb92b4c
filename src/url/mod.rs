//! URL handling module for Campaign-Sieve
//!
//! Listing pages hand back hrefs in every shape: absolute, root-relative,
//! path-relative, `javascript:` stubs. This module turns them into absolute,
//! canonical campaign URLs so that deduplication compares like with like.

mod normalize;
mod resolve;

// Re-export main functions
pub use normalize::canonicalize_link;
pub use resolve::{resolve_link, resolve_url};
