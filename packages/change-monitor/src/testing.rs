//! Test doubles for the fetcher and extraction collaborators.
//!
//! Useful for exercising the pipeline without network calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{FetchError, FetchResult};
use crate::traits::extractor::{ExtractionFailure, ExtractionRequest, Extractor};
use crate::traits::fetcher::{FetchedPage, PageFetcher, SourceLister};
use crate::types::config::{SourceDefinition, SourceKind};
use crate::types::record::StructuredFields;

/// In-memory fetcher and source lister.
///
/// Pages and listings can be changed between runs through the `set_*`
/// methods; clones share state.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, String>>>,
    listings: Arc<RwLock<HashMap<String, Vec<String>>>>,
    failing_listings: Arc<RwLock<HashSet<String>>>,
    fetches: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.set_page(url, content);
        self
    }

    /// List these URLs for the source with this name.
    pub fn with_listing(self, source_name: impl Into<String>, urls: &[&str]) -> Self {
        self.set_listing(source_name, urls);
        self
    }

    pub fn set_page(&self, url: impl Into<String>, content: impl Into<String>) {
        self.pages.write().unwrap().insert(url.into(), content.into());
    }

    /// Make the page unreachable (HTTP 404).
    pub fn remove_page(&self, url: &str) {
        self.pages.write().unwrap().remove(url);
    }

    pub fn set_listing(&self, source_name: impl Into<String>, urls: &[&str]) {
        self.listings.write().unwrap().insert(
            source_name.into(),
            urls.iter().map(|u| u.to_string()).collect(),
        );
    }

    /// Make listing this source fail.
    pub fn fail_listing(&self, source_name: impl Into<String>) {
        self.failing_listings.write().unwrap().insert(source_name.into());
    }

    /// How often `url` was fetched (cache hits excluded).
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.read().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        self.fetches.write().unwrap().push(url.to_string());
        match self.pages.read().unwrap().get(url) {
            Some(content) => Ok(FetchedPage::new(url, content.clone())),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[async_trait]
impl SourceLister for MockFetcher {
    async fn list_urls(&self, source: &SourceDefinition) -> FetchResult<Vec<String>> {
        if self.failing_listings.read().unwrap().contains(&source.name) {
            return Err(FetchError::Status {
                url: source.url.clone(),
                status: 503,
            });
        }
        if let Some(urls) = self.listings.read().unwrap().get(&source.name) {
            return Ok(urls.clone());
        }
        match source.kind {
            SourceKind::Static => Ok(source.urls.clone()),
            SourceKind::Listing => Err(FetchError::Status {
                url: source.url.clone(),
                status: 404,
            }),
        }
    }
}

/// Extractor with canned answers per URL.
///
/// URLs without a canned answer get a title taken from the first
/// non-blank line of the content, so different content yields a
/// significant change.
#[derive(Clone, Default)]
pub struct MockExtractor {
    fields: Arc<RwLock<HashMap<String, StructuredFields>>>,
    failures: Arc<RwLock<HashMap<String, String>>>,
    requests: Arc<RwLock<Vec<ExtractionRequest>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(self, url: impl Into<String>, fields: StructuredFields) -> Self {
        self.set_fields(url, fields);
        self
    }

    pub fn with_failure(self, url: impl Into<String>, reason: impl Into<String>) -> Self {
        self.failures.write().unwrap().insert(url.into(), reason.into());
        self
    }

    pub fn set_fields(&self, url: impl Into<String>, fields: StructuredFields) {
        let url = url.into();
        self.failures.write().unwrap().remove(&url);
        self.fields.write().unwrap().insert(url, fields);
    }

    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.requests.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.read().unwrap().len()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> std::result::Result<StructuredFields, ExtractionFailure> {
        self.requests.write().unwrap().push(request.clone());

        if let Some(reason) = self.failures.read().unwrap().get(&request.url) {
            return Err(ExtractionFailure::new(reason.clone()));
        }
        if let Some(fields) = self.fields.read().unwrap().get(&request.url) {
            return Ok(fields.clone());
        }

        let title = request
            .content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        Ok(StructuredFields::default().with_title(title))
    }
}
