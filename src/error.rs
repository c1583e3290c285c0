//! Error types for remote track search

use thiserror::Error;

pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Failures of the remote search path.
/// "No results" is not an error; see `resolver::Resolution::NotFound`.
#[derive(Debug, Error)]
pub enum SearchError {
    /// No API credential configured
    #[error("Jamendo client id is not configured (set JAMENDO_CLIENT_ID)")]
    Configuration,

    /// Search API answered with a non-success status
    #[error("Jamendo HTTP {status}")]
    Upstream { status: u16 },

    /// Request never completed
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SearchError {
    /// Whether retrying the same action can help
    pub fn is_transient(&self) -> bool {
        !matches!(self, SearchError::Configuration)
    }
}
