//! Error types for Gator.

use std::time::Duration;

use thiserror::Error;

/// Common error type for Gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// There is no feed to poll.
    #[error("no feeds available to fetch")]
    NoFeedsAvailable,

    /// Network, transport or non-success HTTP status while fetching a feed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The fetched body is not a usable RSS document.
    #[error("decode error: {0}")]
    Decode(String),

    /// No accepted date format matched.
    #[error("unable to parse date: {0:?}")]
    DateParse(String),

    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// Polling interval below the configured floor.
    #[error("polling interval {interval:?} is shorter than the minimum of {minimum:?}")]
    IntervalTooShort {
        /// Requested interval.
        interval: Duration,
        /// Configured floor.
        minimum: Duration,
    },

    /// A duration argument could not be parsed.
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    /// The operation was interrupted by a shutdown request.
    #[error("operation cancelled")]
    Cancelled,

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Command name missing from the dispatch table.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

impl GatorError {
    /// Whether the error only concerns the feed being polled, as opposed to
    /// the process configuration.
    pub fn is_feed_level(&self) -> bool {
        matches!(
            self,
            GatorError::NoFeedsAvailable
                | GatorError::Fetch(_)
                | GatorError::Decode(_)
                | GatorError::Database(_)
        )
    }
}

/// Result type alias for Gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
