//! Configuration types for monitoring runs and sources.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Backend collections the engine reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collections {
    /// One item per monitored URL.
    pub documents: String,

    /// Versioned structured records.
    pub records: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            documents: "foerdermittel_scraped_data".to_string(),
            records: "foerdermittel".to_string(),
        }
    }
}

/// Minimum time a previously active document must go unseen before it is
/// marked removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyBuffer {
    pub days: i64,
}

impl SafetyBuffer {
    /// One missed weekly scan plus margin.
    pub const DEFAULT_DAYS: i64 = 7;

    pub fn days(days: i64) -> Self {
        Self { days: days.max(0) }
    }

    /// Buffer derived from scan cadence: `max(2 × interval, 1 day)`.
    pub fn from_scan_interval(interval: Duration) -> Self {
        let two_intervals = interval * 2;
        Self {
            days: two_intervals.num_days().max(1),
        }
    }
}

impl Default for SafetyBuffer {
    fn default() -> Self {
        Self::days(Self::DEFAULT_DAYS)
    }
}

/// Configuration for a monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub collections: Collections,

    /// Maximum documents per source. `None` = all listed documents.
    pub max_items_per_source: Option<usize>,

    /// How long a fetched page stays valid in the page cache.
    ///
    /// Default: 168 hours (one weekly scan).
    pub cache_ttl_hours: i64,

    pub safety_buffer: SafetyBuffer,

    /// Trim lines and drop blank ones before hashing, so reflowed markup
    /// does not register as a change. Default: true.
    pub normalize_content: bool,

    /// Skip re-classifying a URL already reconciled with the same content
    /// in this run (a source listed twice). Default: true.
    pub skip_duplicate_content: bool,

    /// Writes are skipped by the repository; only labels the summary.
    pub dry_run: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            collections: Collections::default(),
            max_items_per_source: Some(10),
            cache_ttl_hours: 168,
            safety_buffer: SafetyBuffer::default(),
            normalize_content: true,
            skip_duplicate_content: true,
            dry_run: false,
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-source limit; negative values mean "all".
    pub fn with_max_items(mut self, max: i64) -> Self {
        self.max_items_per_source = usize::try_from(max).ok();
        self
    }

    pub fn with_safety_buffer(mut self, buffer: SafetyBuffer) -> Self {
        self.safety_buffer = buffer;
        self
    }

    pub fn with_collections(mut self, collections: Collections) -> Self {
        self.collections = collections;
        self
    }

    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize_content = normalize;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::hours(self.cache_ttl_hours)
    }
}

/// How candidate URLs are obtained for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Links on the listing page at `url`.
    #[default]
    Listing,
    /// A fixed list of document URLs.
    Static,
}

/// A source of monitored documents (one funding database, one event
/// calendar, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDefinition {
    pub name: String,
    pub url: String,

    #[serde(default, rename = "type")]
    pub kind: SourceKind,

    /// Document URLs for [`SourceKind::Static`] sources.
    #[serde(default)]
    pub urls: Vec<String>,

    /// Only listing links containing this substring are monitored.
    #[serde(default)]
    pub link_pattern: Option<String>,

    /// Whether fetched pages may be served from the page cache.
    #[serde(default = "default_true")]
    pub use_cache: bool,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl SourceDefinition {
    pub fn listing(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: SourceKind::Listing,
            urls: Vec::new(),
            link_pattern: None,
            use_cache: true,
            description: None,
        }
    }

    pub fn fixed(name: impl Into<String>, urls: Vec<String>) -> Self {
        let urls: Vec<String> = urls;
        Self {
            name: name.into(),
            url: urls.first().cloned().unwrap_or_default(),
            kind: SourceKind::Static,
            urls,
            link_pattern: None,
            use_cache: true,
            description: None,
        }
    }

    pub fn with_link_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.link_pattern = Some(pattern.into());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::Config("source name must not be empty".into()));
        }
        match self.kind {
            SourceKind::Listing if url::Url::parse(&self.url).is_err() => Err(MonitorError::Config(
                format!("source {} has invalid url: {}", self.name, self.url),
            )),
            SourceKind::Static if self.urls.is_empty() => Err(MonitorError::Config(format!(
                "static source {} lists no urls",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

/// The sources file: `{ "sources": [ ... ] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceDefinition>,
}

impl SourcesFile {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SourcesFile = serde_json::from_str(json)?;
        for source in &file.sources {
            source.validate()?;
        }
        Ok(file)
    }
}

impl Default for SourcesFile {
    fn default() -> Self {
        let mut dsee = SourceDefinition::listing(
            "DSEE Förderdatenbank",
            "https://foerderdatenbank.d-s-e-e.de/",
        )
        .with_link_pattern("/foerderung/");
        dsee.description =
            Some("Deutsche Stiftung für Engagement und Ehrenamt funding database".to_string());

        Self {
            sources: vec![dsee],
        }
    }
}
