//! Error types for gator.

use thiserror::Error;

/// Common error type for gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Wraps any store error that is not a recognized unique-key violation.
    #[error("database error: {0}")]
    Database(String),

    /// Unique-key violation reported by the store.
    #[error("already exists: {0}")]
    Conflict(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad command-line argument.
    #[error("usage error: {0}")]
    Usage(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Network failure while fetching a feed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Feed body could not be decoded as RSS.
    #[error("parse error: {0}")]
    Parse(String),

    /// Publish date matched none of the known layouts.
    #[error("unable to parse date: {0}")]
    DateParse(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        let is_unique_violation = e
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);

        if is_unique_violation {
            GatorError::Conflict(e.to_string())
        } else {
            GatorError::Database(e.to_string())
        }
    }
}

/// Result type alias for gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
