//! Output module for the JSON artifact and run reporting
//!
//! This module handles:
//! - Keeping the JSON artifact in step with accepted records
//! - Printing the end-of-run summary
//! - Printing database statistics

pub mod stats;
mod writer;

pub use stats::{load_statistics, print_run_summary, print_statistics, DatabaseStatistics};
pub use writer::IncrementalWriter;

use thiserror::Error;

/// Errors raised while writing the artifact
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to replace artifact: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
