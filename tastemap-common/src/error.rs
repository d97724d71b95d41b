//! Common error types for tastemap
//!
//! Two families share one enum:
//! - blocking conditions raised while loading the catalog (`DataUnavailable`,
//!   `SchemaMismatch`), which stop all ranking
//! - recoverable scan conditions (`NoMatch`, `CaptureFailed`), which are
//!   reported as transient notices and never touch the target or ratings

use thiserror::Error;

/// Common result type for tastemap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across tastemap crates
#[derive(Error, Debug)]
pub enum Error {
    /// A catalog table could not be fetched or parsed
    #[error("Catalog data unavailable: {0}")]
    DataUnavailable(String),

    /// A catalog record lacks usable taste coordinates
    ///
    /// Such records are excluded from the snapshot; the load itself continues.
    #[error("Schema mismatch at row {row}: {reason}")]
    SchemaMismatch {
        /// 1-based data row (header excluded)
        row: usize,
        /// What was wrong with the record
        reason: String,
    },

    /// A code was decoded but no catalog item carries it
    #[error("No catalog item matches code \"{0}\"")]
    NoMatch(String),

    /// Camera/decoder failure, or the scan was cancelled
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or command parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for conditions that block the session (no catalog, no ranking)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DataUnavailable(_) | Error::Config(_) | Error::Io(_)
        )
    }

    /// True for scan conditions that are reported and then forgotten
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::NoMatch(_) | Error::CaptureFailed(_))
    }
}
