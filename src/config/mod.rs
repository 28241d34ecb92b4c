//! Configuration module for Campaign-Sieve
//!
//! One TOML file describes one target site: where the listing lives, how to
//! pull links out of it, the fallback chains for every record field, and
//! where results go. Files are validated on load, so a broken selector or
//! URL template fails before any request is made.
//!
//! # Example
//!
//! ```no_run
//! use campaign_sieve::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sites/paraf.toml")).unwrap();
//! println!("Harvesting {} ({})", config.site.name, config.site.card);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffConfig, Config, DetailConfig, ListingConfig, ListingMode, OutputConfig,
    PolitenessConfig, RetryConfig, SessionConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
