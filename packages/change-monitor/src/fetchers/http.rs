//! Plain HTTP fetcher and listing-page link collector.

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{FetchError, FetchResult, MonitorError, Result};
use crate::traits::fetcher::{FetchedPage, PageFetcher, SourceLister};
use crate::types::config::{SourceDefinition, SourceKind};

/// Fetches pages over HTTP and lists sources from static URL lists or
/// listing pages.
///
/// Selector-based scraping is left to the extraction collaborator; a
/// listing page only contributes its same-host `href` links.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    href_pattern: Regex,
}

impl HttpFetcher {
    pub const DEFAULT_USER_AGENT: &'static str = "change-monitor/0.1";

    /// Fetcher with a 30 second timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
            href_pattern: Regex::new(r#"href\s*=\s*["']([^"']+)["']"#)
                .expect("href pattern is valid"),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Absolute, same-host links on `html`, fragments stripped, in page
    /// order without duplicates.
    pub fn extract_links(&self, base_url: &Url, html: &str, pattern: Option<&str>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for cap in self.href_pattern.captures_iter(html) {
            let Some(href) = cap.get(1).map(|m| m.as_str().trim()) else {
                continue;
            };

            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
            {
                continue;
            }

            let Ok(mut resolved) = base_url.join(href) else {
                continue;
            };
            resolved.set_fragment(None);

            if resolved.host_str() != base_url.host_str() {
                continue;
            }
            if let Some(pattern) = pattern {
                if !resolved.as_str().contains(pattern) {
                    continue;
                }
            }

            let link = resolved.to_string();
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }

        links
    }

    async fn get_text(&self, url: &str) -> FetchResult<String> {
        debug!(url = %url, "HTTP fetch starting");
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
                FetchError::Http {
                    url: url.to_string(),
                    source: Box::new(e),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: Box::new(e),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedPage> {
        Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;

        let content = self.get_text(url).await?;
        if content.trim().is_empty() {
            return Err(FetchError::Empty {
                url: url.to_string(),
            });
        }

        Ok(FetchedPage {
            url: url.to_string(),
            content,
            fetched_at: Utc::now(),
            from_cache: false,
        })
    }
}

#[async_trait]
impl SourceLister for HttpFetcher {
    async fn list_urls(&self, source: &SourceDefinition) -> FetchResult<Vec<String>> {
        match source.kind {
            SourceKind::Static => Ok(source.urls.clone()),
            SourceKind::Listing => {
                let base_url = Url::parse(&source.url).map_err(|_| FetchError::InvalidUrl {
                    url: source.url.clone(),
                })?;
                let html = self.get_text(&source.url).await?;
                let links = self.extract_links(&base_url, &html, source.link_pattern.as_deref());
                info!(source = %source.name, links = links.len(), "Listing page scanned");
                Ok(links)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::with_client(reqwest::Client::new())
    }

    #[test]
    fn test_extract_links_filters_and_resolves() {
        let base = Url::parse("https://foerderdatenbank.example.org/liste").unwrap();
        let html = r##"
            <a href="/foerderung/a#details">A</a>
            <a href='https://foerderdatenbank.example.org/foerderung/b'>B</a>
            <a href="/foerderung/a">A again</a>
            <a href="https://other.example.org/foerderung/c">C</a>
            <a href="/impressum">Impressum</a>
            <a href="mailto:info@example.org">Mail</a>
            <a href="#top">Top</a>
        "##;

        let links = fetcher().extract_links(&base, html, Some("/foerderung/"));
        assert_eq!(
            links,
            vec![
                "https://foerderdatenbank.example.org/foerderung/a",
                "https://foerderdatenbank.example.org/foerderung/b",
            ]
        );
    }

    #[test]
    fn test_extract_links_without_pattern_keeps_same_host() {
        let base = Url::parse("https://e.com/").unwrap();
        let html = r#"<a href="a">1</a><a href="https://x.com/b">2</a>"#;
        assert_eq!(fetcher().extract_links(&base, html, None), vec!["https://e.com/a"]);
    }

    #[tokio::test]
    async fn test_static_source_lists_configured_urls() {
        let source = SourceDefinition::fixed(
            "Static",
            vec!["https://e.com/1".to_string(), "https://e.com/2".to_string()],
        );
        let urls = fetcher().list_urls(&source).await.unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_request() {
        let err = fetcher().fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
