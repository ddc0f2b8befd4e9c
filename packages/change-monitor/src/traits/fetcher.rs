//! Fetching pages and listing sources.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;
use crate::types::config::SourceDefinition;

/// Raw content of one fetched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,

    /// Raw content (HTML or text).
    pub content: String,

    pub fetched_at: DateTime<Utc>,

    /// Whether the content came from the page cache.
    #[serde(default)]
    pub from_cache: bool,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
            fetched_at: Utc::now(),
            from_cache: false,
        }
    }

    pub fn cached(mut self) -> Self {
        self.from_cache = true;
        self
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Fetches the content behind a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage>;
}

/// Produces the candidate document URLs of a source.
#[async_trait]
pub trait SourceLister: Send + Sync {
    /// URLs in listing order. May contain duplicates.
    async fn list_urls(&self, source: &SourceDefinition) -> FetchResult<Vec<String>>;
}
