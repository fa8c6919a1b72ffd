//! Error types for the query and cache layers.
//!
//! Parsing and signature matching never fail across their public boundary;
//! they report problems through their return values instead.

use thiserror::Error;

/// Terminal failure for a single package lookup.
///
/// None of these are retried. [`QueryError::code`] is the stable string
/// stored in [`QueryOutcome::error`](crate::model::QueryOutcome).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("vulnerability database is unreachable")]
    NetworkUnavailable,

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {0}")]
    Http(u16),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("batch deadline reached before the request was dispatched")]
    Cancelled,
}

impl QueryError {
    pub fn code(&self) -> String {
        match self {
            QueryError::NetworkUnavailable => "network_unavailable".to_string(),
            QueryError::Timeout => "timeout".to_string(),
            QueryError::Network(detail) => format!("network_error: {}", detail),
            QueryError::Http(status) => format!("http_error: {}", status),
            QueryError::Decode(detail) => format!("decode_error: {}", detail),
            QueryError::Cancelled => "cancelled".to_string(),
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QueryError::Timeout
        } else if err.is_decode() {
            QueryError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            QueryError::Http(status.as_u16())
        } else {
            QueryError::Network(err.to_string())
        }
    }
}

/// Failure while writing to the result cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to persist cache entry: {0}")]
    Persist(#[from] tempfile::PersistError),
}
