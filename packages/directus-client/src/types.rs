use std::time::Duration;

use secrecy::SecretBox;
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// How the client authenticates against Directus.
///
/// Secrets are wrapped in `secrecy::SecretBox` so they never show up in
/// debug output or logs.
#[derive(Debug)]
pub enum Auth {
    /// Static API token, used as-is.
    Token(SecretBox<str>),
    /// Admin credentials exchanged for an access token via `/auth/login`.
    Credentials {
        email: String,
        password: SecretBox<str>,
    },
}

impl Auth {
    pub fn token(token: impl Into<String>) -> Self {
        Auth::Token(secret(token.into()))
    }

    pub fn credentials(email: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Credentials {
            email: email.into(),
            password: secret(password.into()),
        }
    }
}

fn secret(value: String) -> SecretBox<str> {
    SecretBox::new(value.into_boxed_str())
}

/// Connection settings for a Directus instance.
#[derive(Debug)]
pub struct DirectusConfig {
    pub base_url: String,
    pub auth: Auth,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl DirectusConfig {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Wrapper for Directus API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginData {
    pub access_token: Option<String>,
}

/// Item query: equality filters, limit and sort.
///
/// Serializes to the `filter`, `limit` and `sort` query parameters of
/// `GET /items/{collection}`.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<(String, serde_json::Value)>,
    limit: Option<i64>,
    sort: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an `_eq` condition on a field.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Limit the number of returned items. `-1` returns everything.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sort by a field; prefix with `-` for descending.
    pub fn sort(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(field.into());
        self
    }

    /// The `filter` parameter as Directus filter JSON.
    pub fn filter_json(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }

        let mut filter = serde_json::Map::new();
        for (field, value) in &self.filters {
            filter.insert(field.clone(), serde_json::json!({ "_eq": value }));
        }

        Some(serde_json::Value::Object(filter).to_string())
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(filter) = self.filter_json() {
            params.push(("filter", filter));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builds_eq_filter() {
        let query = Query::new()
            .eq("url", "https://example.com/a")
            .eq("is_active", true)
            .limit(-1)
            .sort("scraped_at");

        let filter: serde_json::Value =
            serde_json::from_str(&query.filter_json().unwrap()).unwrap();
        assert_eq!(filter["url"]["_eq"], "https://example.com/a");
        assert_eq!(filter["is_active"]["_eq"], true);

        let params = query.to_params();
        assert!(params.contains(&("limit", "-1".to_string())));
        assert!(params.contains(&("sort", "scraped_at".to_string())));
    }

    #[test]
    fn test_empty_query_has_no_filter() {
        let query = Query::new();
        assert!(query.filter_json().is_none());
        assert!(query.to_params().is_empty());
    }

    #[test]
    fn test_auth_debug_redacts_secrets() {
        let rendered = format!("{:?}", Auth::credentials("admin@example.org", "hunter2"));
        assert!(rendered.contains("admin@example.org"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = DirectusConfig::new("https://cms.example.org/", Auth::token("t"));
        assert_eq!(config.base_url, "https://cms.example.org");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
