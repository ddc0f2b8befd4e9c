//! Orchestrates one monitoring pass.
//!
//! Sources are processed one after another, URLs of a source one after
//! another. For each URL: fetch (through the page cache), digest, classify,
//! write the transition and, when an extractor is configured, reconcile
//! versions right away. The removal sweep of a source runs only after all
//! of its URLs are done.

use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::cache::{normalize_content, HashIndex, PageCache};
use crate::error::{MonitorError, Result};
use crate::pipeline::analyze::Analyzer;
use crate::pipeline::detect::ChangeDetector;
use crate::pipeline::sweep::RemovalSweeper;
use crate::traits::extractor::{Extractor, NoExtractor};
use crate::traits::fetcher::{FetchedPage, PageFetcher, SourceLister};
use crate::traits::store::RecordRepository;
use crate::types::config::{MonitorConfig, SourceDefinition};
use crate::types::document::{DocumentPatch, MonitoredDocument, NewDocument};
use crate::types::report::{AnalysisOutcome, ChangeStatus, RunSummary, SourceSummary};

/// Drives fetch → classify → reconcile → sweep.
pub struct RunCoordinator<R, F, E = NoExtractor> {
    repo: R,
    fetcher: F,
    extractor: Option<E>,
    cache: Option<PageCache>,
    config: MonitorConfig,
}

impl<R, F> RunCoordinator<R, F, NoExtractor>
where
    R: RecordRepository,
    F: PageFetcher + SourceLister,
{
    /// Coordinator without extraction: new and changed documents stay
    /// pending for a later analysis pass.
    pub fn new(repo: R, fetcher: F, config: MonitorConfig) -> Self {
        Self {
            repo,
            fetcher,
            extractor: None,
            cache: None,
            config,
        }
    }
}

impl<R, F, E> RunCoordinator<R, F, E>
where
    R: RecordRepository,
    F: PageFetcher + SourceLister,
    E: Extractor,
{
    /// Reconcile versions inline with this extractor.
    pub fn with_extractor<E2: Extractor>(self, extractor: E2) -> RunCoordinator<R, F, E2> {
        RunCoordinator {
            repo: self.repo,
            fetcher: self.fetcher,
            extractor: Some(extractor),
            cache: self.cache,
            config: self.config,
        }
    }

    pub fn with_cache(mut self, cache: PageCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn cache(&self) -> Option<&PageCache> {
        self.cache.as_ref()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Scan every source in order.
    ///
    /// A fatal backend error aborts the run; everything written before it
    /// stays written.
    pub async fn run(&self, sources: &[SourceDefinition]) -> Result<RunSummary> {
        let mut summary = RunSummary::start(self.config.dry_run);
        let mut index = HashIndex::new();

        info!(sources = sources.len(), dry_run = self.config.dry_run, "Starting monitoring run");

        for source in sources {
            let source_summary = self.scan_source_with(source, &mut index).await?;
            summary.sources.push(source_summary);
        }

        summary.finish();
        let total = summary.total();
        info!(
            new = total.new,
            unchanged = total.unchanged,
            changed = total.changed,
            removed = total.removed,
            failed = total.failed,
            "Monitoring run complete"
        );

        Ok(summary)
    }

    /// Scan a single source with a fresh hash index.
    pub async fn scan_source(&self, source: &SourceDefinition) -> Result<SourceSummary> {
        self.scan_source_with(source, &mut HashIndex::new()).await
    }

    async fn scan_source_with(
        &self,
        source: &SourceDefinition,
        index: &mut HashIndex,
    ) -> Result<SourceSummary> {
        let mut summary = SourceSummary::new(&source.name);
        info!(source = %source.name, url = %source.url, "Scanning source");

        let listed = match self.fetcher.list_urls(source).await {
            Ok(urls) => urls,
            Err(e) => {
                // Without a complete listing a sweep would delist live documents.
                error!(source = %source.name, error = %e, "Failed to list source, skipping");
                summary.error = Some(e.to_string());
                return Ok(summary);
            }
        };

        let mut observed = HashSet::new();
        let urls: Vec<String> = listed
            .into_iter()
            .filter(|url| observed.insert(url.clone()))
            .collect();
        let urls = match self.config.max_items_per_source {
            Some(max) => &urls[..urls.len().min(max)],
            None => &urls[..],
        };
        summary.listed = urls.len();

        for url in urls {
            match self.process_url(source, url, index, &mut summary).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    error!(source = %source.name, url = %url, error = %e, "Backend unavailable, aborting run");
                    return Err(e);
                }
                Err(e) => {
                    warn!(source = %source.name, url = %url, error = %e, "Failed to process document");
                    summary.failed += 1;
                }
            }
        }

        let sweeper = RemovalSweeper::new(&self.repo, self.config.safety_buffer);
        match sweeper.sweep(&source.name, &observed).await {
            Ok(report) => {
                summary.removed = report.removed;
                summary.failed += report.failed;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(source = %source.name, error = %e, "Removal sweep failed");
                summary.error = Some(format!("removal sweep failed: {}", e));
            }
        }

        info!(
            source = %source.name,
            listed = summary.listed,
            new = summary.new,
            unchanged = summary.unchanged,
            changed = summary.changed,
            duplicate = summary.duplicate,
            removed = summary.removed,
            failed = summary.failed,
            "Source scan complete"
        );

        Ok(summary)
    }

    async fn process_url(
        &self,
        source: &SourceDefinition,
        url: &str,
        index: &mut HashIndex,
        summary: &mut SourceSummary,
    ) -> Result<()> {
        let page = self.fetch_page(source, url).await?;

        let hash = if self.config.normalize_content {
            HashIndex::digest(&normalize_content(&page.content))
        } else {
            HashIndex::digest(&page.content)
        };

        if self.config.skip_duplicate_content && index.seen(&source.name, url, &hash) {
            debug!(url = %url, hash = %hash, "Document already reconciled in this run");
            summary.duplicate += 1;
            return Ok(());
        }

        let classification = ChangeDetector::new(&self.repo, &source.name)
            .classify(url, &hash)
            .await?;
        let now = Utc::now();

        let pending: Option<MonitoredDocument> = match classification.status {
            ChangeStatus::New => {
                let new_doc =
                    NewDocument::first_sighting(url, &source.name, hash.clone(), page.content, now);
                let doc = self.repo.create_document(&new_doc).await?;
                info!(url = %url, document_id = %doc.id, "New document");
                Some(doc)
            }
            ChangeStatus::Unchanged => {
                let doc = classification.existing.ok_or_else(|| {
                    MonitorError::InconsistentState(format!("unchanged document without record: {}", url))
                })?;
                self.repo
                    .update_document(&doc.id, &DocumentPatch::unchanged(&doc, now))
                    .await?;
                debug!(url = %url, check_count = doc.check_count + 1, "Document unchanged");
                None
            }
            ChangeStatus::Changed => {
                let mut doc = classification.existing.ok_or_else(|| {
                    MonitorError::InconsistentState(format!("changed document without record: {}", url))
                })?;
                let patch = DocumentPatch::changed(&doc, hash.clone(), page.content, now);
                self.repo.update_document(&doc.id, &patch).await?;
                info!(
                    url = %url,
                    document_id = %doc.id,
                    previous_hash = %doc.content_hash,
                    new_hash = %hash,
                    "Document changed"
                );
                patch.apply_to(&mut doc);
                Some(doc)
            }
        };

        index.record(&source.name, url, hash);
        summary.record(classification.status);

        if let (Some(doc), Some(extractor)) = (pending, &self.extractor) {
            match Analyzer::new(&self.repo, extractor).process_document(&doc).await {
                Ok(AnalysisOutcome::Failed { .. }) => summary.extraction_failed += 1,
                Ok(_) => summary.extracted += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    // The transition is written; the document stays pending for `analyze`.
                    warn!(url = %url, error = %e, "Extraction step failed");
                    summary.extraction_failed += 1;
                }
            }
        }

        Ok(())
    }

    /// Fetch through the page cache when the source allows it. Dry runs
    /// read the cache but never write it.
    async fn fetch_page(&self, source: &SourceDefinition, url: &str) -> Result<FetchedPage> {
        let cache = self.cache.as_ref().filter(|_| source.use_cache);

        if let Some(content) = cache.and_then(|cache| cache.get(url)) {
            return Ok(FetchedPage::new(url, content).cached());
        }

        let page = self.fetcher.fetch(url).await?;
        if let Some(cache) = cache.filter(|_| !self.config.dry_run) {
            cache.set(url, &page.content);
        }
        Ok(page)
    }
}
