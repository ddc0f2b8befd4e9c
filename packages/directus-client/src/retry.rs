//! Retry policy with exponential backoff.
//!
//! All transient-failure handling for the client lives here so callers
//! only ever see a final success or a final error.
//!
//! Non-idempotent requests (`POST`) are only re-sent when the server cannot
//! have acted on them: the connection was never established, or the server
//! answered 429.

use std::time::Duration;

/// Bounded retry with doubling backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt (doubles each retry).
    pub initial_backoff: Duration,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait before `attempt` (1-based; attempt 1 has no delay).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Whether repeating a request with this method has no additional effect.
    pub fn is_idempotent(method: &reqwest::Method) -> bool {
        method != reqwest::Method::POST
    }

    /// Whether a response status is worth another attempt.
    pub fn should_retry_status(method: &reqwest::Method, status: reqwest::StatusCode) -> bool {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return true;
        }
        Self::is_idempotent(method) && status.is_server_error()
    }

    /// Whether a transport error is worth another attempt.
    pub fn should_retry_error(method: &reqwest::Method, error: &reqwest::Error) -> bool {
        if error.is_connect() {
            return true;
        }
        Self::is_idempotent(method) && error.is_timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(2),
        };

        assert_eq!(policy.backoff_for(1), Duration::ZERO);
        assert_eq!(policy.backoff_for(2), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(5), Duration::from_secs(2));
    }

    #[test]
    fn test_retryable_statuses() {
        let get = reqwest::Method::GET;
        assert!(RetryPolicy::should_retry_status(&get, reqwest::StatusCode::BAD_GATEWAY));
        assert!(RetryPolicy::should_retry_status(
            &get,
            reqwest::StatusCode::TOO_MANY_REQUESTS
        ));
        assert!(!RetryPolicy::should_retry_status(&get, reqwest::StatusCode::BAD_REQUEST));
        assert!(!RetryPolicy::should_retry_status(&get, reqwest::StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_post_only_retried_when_not_processed() {
        let post = reqwest::Method::POST;
        assert!(!RetryPolicy::should_retry_status(
            &post,
            reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
        assert!(RetryPolicy::should_retry_status(
            &post,
            reqwest::StatusCode::TOO_MANY_REQUESTS
        ));
        assert!(RetryPolicy::should_retry_status(
            &reqwest::Method::PATCH,
            reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[test]
    fn test_none_policy() {
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
