//! Mark documents removed once their source has stopped listing them.
//!
//! Runs after every URL of a source has been classified. A document is
//! only delisted after going unseen for the whole safety buffer, so one
//! failed fetch or a transient listing glitch cannot remove a live page.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::traits::store::DocumentStore;
use crate::types::config::SafetyBuffer;
use crate::types::document::{DocumentPatch, MonitoredDocument};
use crate::types::report::SweepReport;

pub struct RemovalSweeper<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    buffer: SafetyBuffer,
}

impl<'a, S: DocumentStore + ?Sized> RemovalSweeper<'a, S> {
    pub fn new(store: &'a S, buffer: SafetyBuffer) -> Self {
        Self { store, buffer }
    }

    pub async fn sweep(&self, source_name: &str, observed: &HashSet<String>) -> Result<SweepReport> {
        self.sweep_at(source_name, observed, Utc::now()).await
    }

    /// Sweep with an explicit clock.
    ///
    /// Listing active documents is the only error returned; a failed update
    /// is logged, counted and the sweep moves on.
    pub async fn sweep_at(
        &self,
        source_name: &str,
        observed: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<SweepReport> {
        let active = self.store.list_active_documents(source_name).await?;
        let mut report = SweepReport::default();

        for doc in active.iter().filter(|doc| !observed.contains(&doc.url)) {
            report.unseen += 1;

            let days = days_since_last_seen(doc, now);
            if days < self.buffer.days {
                debug!(
                    url = %doc.url,
                    days_unseen = days,
                    buffer_days = self.buffer.days,
                    "Unseen document within safety buffer"
                );
                report.within_buffer += 1;
                continue;
            }

            match self
                .store
                .update_document(&doc.id, &DocumentPatch::removed(now))
                .await
            {
                Ok(()) => {
                    info!(url = %doc.url, source = %source_name, days_unseen = days, "Marked document as removed");
                    report.removed += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(url = %doc.url, error = %e, "Failed to mark document as removed");
                    report.failed += 1;
                }
            }
        }

        info!(
            source = %source_name,
            active = active.len(),
            unseen = report.unseen,
            removed = report.removed,
            within_buffer = report.within_buffer,
            "Removal sweep complete"
        );

        Ok(report)
    }
}

/// Whole days since the document was last seen. A missing timestamp counts
/// as longer than any buffer.
fn days_since_last_seen(doc: &MonitoredDocument, now: DateTime<Utc>) -> i64 {
    match doc.last_seen_at {
        Some(last_seen) => (now - last_seen).num_days(),
        None => i64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryRepository;
    use crate::types::document::{ContentHash, NewDocument, ProcessingStatus};
    use chrono::Duration;

    fn seed(repo: &MemoryRepository, url: &str, last_seen: Option<DateTime<Utc>>) {
        let now = Utc::now();
        let mut doc = NewDocument::first_sighting(url, "Example", ContentHash::of(url), url, now)
            .into_document(crate::types::document::RecordId::new(url));
        doc.last_seen_at = last_seen;
        repo.insert_document(doc);
    }

    fn observed(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_buffer_boundary() {
        let repo = MemoryRepository::new();
        let now = Utc::now();
        seed(&repo, "https://example.com/six", Some(now - Duration::days(6)));
        seed(&repo, "https://example.com/seven", Some(now - Duration::days(7)));

        let report = RemovalSweeper::new(&repo, SafetyBuffer::default())
            .sweep_at("Example", &observed(&[]), now)
            .await
            .unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.within_buffer, 1);

        let six = repo.document_by_url("https://example.com/six").unwrap();
        assert!(six.is_active);

        let seven = repo.document_by_url("https://example.com/seven").unwrap();
        assert!(!seven.is_active);
        assert_eq!(seven.processing_status, ProcessingStatus::Removed);
        assert_eq!(seven.last_checked_at, Some(now));
    }

    #[tokio::test]
    async fn test_observed_documents_are_never_removed() {
        let repo = MemoryRepository::new();
        let now = Utc::now();
        seed(&repo, "https://example.com/a", Some(now - Duration::days(30)));

        let report = RemovalSweeper::new(&repo, SafetyBuffer::default())
            .sweep_at("Example", &observed(&["https://example.com/a"]), now)
            .await
            .unwrap();

        assert_eq!(report, SweepReport::default());
        assert!(repo.document_by_url("https://example.com/a").unwrap().is_active);
    }

    #[tokio::test]
    async fn test_missing_last_seen_counts_as_expired() {
        let repo = MemoryRepository::new();
        seed(&repo, "https://example.com/a", None);

        let report = RemovalSweeper::new(&repo, SafetyBuffer::days(365))
            .sweep("Example", &observed(&[]))
            .await
            .unwrap();
        assert_eq!(report.removed, 1);
    }

    #[tokio::test]
    async fn test_failed_update_does_not_stop_sweep() {
        let repo = MemoryRepository::new();
        let now = Utc::now();
        seed(&repo, "https://example.com/a", Some(now - Duration::days(10)));
        seed(&repo, "https://example.com/b", Some(now - Duration::days(10)));
        repo.fail_updates_for("https://example.com/a");

        let report = RemovalSweeper::new(&repo, SafetyBuffer::default())
            .sweep_at("Example", &observed(&[]), now)
            .await
            .unwrap();

        assert_eq!((report.removed, report.failed), (1, 1));
        assert!(repo.document_by_url("https://example.com/a").unwrap().is_active);
        assert!(!repo.document_by_url("https://example.com/b").unwrap().is_active);
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let repo = MemoryRepository::new();
        repo.fail_reads(true);

        let result = RemovalSweeper::new(&repo, SafetyBuffer::default())
            .sweep("Example", &observed(&[]))
            .await;
        assert!(result.is_err());
    }
}
