//! Violation record source.
//!
//! Downloads (or reads) the spreadsheet once per run and turns it into
//! [`RawRecord`](crate::models::RawRecord)s. Nothing here is retried or
//! cached; a failure is fatal to the run.

pub mod loader;
pub mod timestamp;

pub use loader::*;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading the record source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Response status.
        status: reqwest::StatusCode,
        /// URL that was requested.
        url: String,
    },

    /// A local file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The payload is not valid CSV.
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is missing from the header row.
    #[error("Required column '{0}' not found in header row")]
    MissingColumn(String),

    /// The source has a header row but no records.
    #[error("Source contains no records")]
    Empty,
}
