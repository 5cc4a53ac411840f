//! Error types for remote trade acquisition.

use datums_cache::CacheError;
use thiserror::Error;

/// Errors that can occur while querying the remote source.
///
/// Format and response errors are non-retriable and abort the whole query
/// call; pages merged into the cache before the failure stay committed.
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote response is missing a required field or carries an
    /// unexpected shape.
    #[error("the exchange response is not in the expected format: {0}")]
    InvalidFormat(String),

    /// The remote explicitly reported an error.
    #[error("the exchange returned an error: {0}")]
    Response(String),

    /// The local trade cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
