//! Error types for the Directus client.

use thiserror::Error;

/// Result type for Directus client operations.
pub type Result<T> = std::result::Result<T, DirectusError>;

/// Directus client errors.
#[derive(Debug, Error)]
pub enum DirectusError {
    /// Transport failure (connection refused, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response that is not worth retrying
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Still unauthorized after re-authenticating once
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Login failed or returned no access token
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Retry policy gave up on a transient failure
    #[error("all {attempts} attempts failed: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl DirectusError {
    /// Whether the backend looks unreachable rather than rejecting the request.
    pub fn is_unavailable(&self) -> bool {
        match self {
            DirectusError::Http(e) => e.is_connect() || e.is_timeout(),
            DirectusError::RetriesExhausted { .. } => true,
            DirectusError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
