//! Typed errors for the monitoring core.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! per-document failure from one that should end the run.

use thiserror::Error;

/// Errors that can occur while monitoring documents.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Backend rejected or failed a single operation
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Backend could not be reached at all
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Backend returned a record that does not match the expected shape
    #[error("invalid {collection} record: {reason}")]
    InvalidRecord { collection: String, reason: String },

    /// Fetching a page or listing a source failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Stored records contradict each other
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MonitorError {
    /// Whether this error should abort the whole run instead of one document.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MonitorError::BackendUnavailable(_))
    }
}

impl From<directus_client::DirectusError> for MonitorError {
    fn from(err: directus_client::DirectusError) -> Self {
        if err.is_unavailable() {
            MonitorError::BackendUnavailable(Box::new(err))
        } else {
            MonitorError::Backend(Box::new(err))
        }
    }
}

/// Errors that can occur while fetching pages.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Server answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Page was fetched but had no usable content
    #[error("empty content: {url}")]
    Empty { url: String },
}

/// Result type alias for monitoring operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailability_is_fatal() {
        let unavailable = MonitorError::BackendUnavailable("connection refused".into());
        assert!(unavailable.is_fatal());

        let rejected = MonitorError::Backend("HTTP 400".into());
        assert!(!rejected.is_fatal());

        let fetch = MonitorError::Fetch(FetchError::Status {
            url: "https://example.com".into(),
            status: 503,
        });
        assert!(!fetch.is_fatal());
    }

    #[test]
    fn test_directus_errors_map_by_availability() {
        let exhausted = directus_client::DirectusError::RetriesExhausted {
            attempts: 3,
            last_error: "HTTP 502".into(),
        };
        assert!(MonitorError::from(exhausted).is_fatal());

        let api = directus_client::DirectusError::Api {
            status: 400,
            message: "bad filter".into(),
        };
        assert!(!MonitorError::from(api).is_fatal());
    }
}
