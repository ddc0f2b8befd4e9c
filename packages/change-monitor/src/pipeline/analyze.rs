//! Extraction and version reconciliation of pending documents.
//!
//! `pending` documents get their first record; `pending_update` documents
//! are reconciled against their current record. Either way the document
//! ends `completed` pointing at its newest record, or `failed` with the
//! extraction error.

use tracing::{error, info, warn};

use crate::error::Result;
use crate::pipeline::version::VersionManager;
use crate::traits::extractor::{ExtractionRequest, Extractor};
use crate::traits::store::RecordRepository;
use crate::types::document::{DocumentPatch, MonitoredDocument, ProcessingStatus, RecordId};
use crate::types::report::{AnalysisOutcome, AnalyzeSummary, ReconcileOutcome};

pub struct Analyzer<'a, R: RecordRepository + ?Sized, E: Extractor + ?Sized> {
    repo: &'a R,
    extractor: &'a E,
}

impl<'a, R: RecordRepository + ?Sized, E: Extractor + ?Sized> Analyzer<'a, R, E> {
    pub fn new(repo: &'a R, extractor: &'a E) -> Self {
        Self { repo, extractor }
    }

    /// Process up to `limit` documents per pending status, oldest first.
    ///
    /// Per-document errors are counted; only a fatal backend error stops
    /// the pass.
    pub async fn process_pending(&self, limit: usize) -> Result<AnalyzeSummary> {
        let mut summary = AnalyzeSummary::default();

        for status in [ProcessingStatus::Pending, ProcessingStatus::PendingUpdate] {
            let documents = self.repo.list_documents_by_status(status, limit).await?;
            info!(status = %status, count = documents.len(), "Documents awaiting extraction");

            for doc in &documents {
                match self.process_document(doc).await {
                    Ok(outcome) => summary.record(&outcome),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        error!(url = %doc.url, document_id = %doc.id, error = %e, "Failed to process document");
                        self.mark_failed(doc, &e.to_string()).await;
                        summary.record(&AnalysisOutcome::Failed {
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            processed = summary.processed,
            created = summary.created,
            versioned = summary.versioned,
            failed = summary.failed,
            "Analysis pass complete"
        );

        Ok(summary)
    }

    /// Extract one document and reconcile the result.
    pub async fn process_document(&self, doc: &MonitoredDocument) -> Result<AnalysisOutcome> {
        if !matches!(
            doc.processing_status,
            ProcessingStatus::Pending | ProcessingStatus::PendingUpdate
        ) {
            return Ok(AnalysisOutcome::Skipped);
        }

        let Some(content) = doc.raw_content.as_deref().filter(|c| !c.trim().is_empty()) else {
            return self.fail(doc, "no raw content stored").await;
        };

        let manager = VersionManager::new(self.repo);
        let previous = match &doc.record_id {
            Some(id) => self.repo.get_record(id).await?.map(|record| record.fields),
            None => None,
        };

        let request = ExtractionRequest {
            url: doc.url.clone(),
            source_name: doc.source_name.clone(),
            content: content.to_string(),
            previous,
        };

        let fields = match self.extractor.extract(&request).await {
            Ok(fields) => fields,
            Err(failure) => return self.fail(doc, &failure.reason).await,
        };

        let (outcome, record_id) =
            if doc.processing_status == ProcessingStatus::Pending && doc.record_id.is_none() {
                let record_id = manager.create_initial(doc, fields).await?;
                (
                    AnalysisOutcome::Created {
                        record_id: record_id.clone(),
                    },
                    record_id,
                )
            } else {
                let reconciled = manager.reconcile(doc.record_id.as_ref(), doc, fields).await?;
                let record_id = reconciled.record_id().clone();
                (AnalysisOutcome::Reconciled(reconciled), record_id)
            };

        self.link(doc, &record_id, &outcome).await?;
        Ok(outcome)
    }

    /// Point the document at its newest record and mark it completed.
    async fn link(
        &self,
        doc: &MonitoredDocument,
        record_id: &RecordId,
        outcome: &AnalysisOutcome,
    ) -> Result<()> {
        if let Err(e) = self
            .repo
            .update_document(&doc.id, &DocumentPatch::completed(Some(record_id.clone())))
            .await
        {
            // The record exists but the document does not point at it; no rollback.
            error!(
                url = %doc.url,
                document_id = %doc.id,
                record_id = %record_id,
                content_hash = %doc.content_hash,
                previous_content_hash = ?doc.previous_content_hash.as_ref().map(|h| h.as_str()),
                error = %e,
                "Record created but document not linked, manual reconciliation needed"
            );
            return Err(e);
        }

        match outcome {
            AnalysisOutcome::Reconciled(ReconcileOutcome::NewVersion { version, change_summary, .. }) => {
                info!(url = %doc.url, version, changes = %change_summary, "Document updated")
            }
            AnalysisOutcome::Reconciled(ReconcileOutcome::NoChange { .. }) => {
                info!(url = %doc.url, "No significant changes")
            }
            _ => info!(url = %doc.url, record_id = %record_id, "Document processed"),
        }
        Ok(())
    }

    async fn fail(&self, doc: &MonitoredDocument, reason: &str) -> Result<AnalysisOutcome> {
        warn!(url = %doc.url, reason = %reason, "Extraction failed");
        self.repo
            .update_document(&doc.id, &DocumentPatch::failed(reason))
            .await?;
        Ok(AnalysisOutcome::Failed {
            reason: reason.to_string(),
        })
    }

    /// Best-effort failure marking after an unexpected error.
    async fn mark_failed(&self, doc: &MonitoredDocument, reason: &str) {
        if let Err(e) = self
            .repo
            .update_document(&doc.id, &DocumentPatch::failed(reason))
            .await
        {
            warn!(url = %doc.url, error = %e, "Failed to record error status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryRepository;
    use crate::testing::MockExtractor;
    use crate::traits::store::{DocumentStore, VersionStore};
    use crate::types::document::{ContentHash, NewDocument};
    use crate::types::record::{RecordStatus, StructuredFields};
    use chrono::Utc;

    const URL: &str = "https://example.com/p/1";

    async fn pending(repo: &MemoryRepository, content: &str) -> MonitoredDocument {
        repo.create_document(&NewDocument::first_sighting(
            URL,
            "Example",
            ContentHash::of(content),
            content,
            Utc::now(),
        ))
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_pending_document_gets_first_record() {
        let repo = MemoryRepository::new();
        let doc = pending(&repo, "v1").await;
        let extractor = MockExtractor::new().with_fields(URL, StructuredFields::default().with_title("A"));

        let outcome = Analyzer::new(&repo, &extractor).process_document(&doc).await.unwrap();
        let AnalysisOutcome::Created { record_id } = outcome else {
            panic!("expected created");
        };

        let doc = repo.document_by_url(URL).unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Completed);
        assert_eq!(doc.record_id, Some(record_id.clone()));
        let record = repo.get_record(&record_id).await.unwrap().unwrap();
        assert_eq!((record.version, record.status), (1, RecordStatus::Draft));
    }

    #[tokio::test]
    async fn test_extraction_failure_marks_document_failed() {
        let repo = MemoryRepository::new();
        let doc = pending(&repo, "v1").await;
        let extractor = MockExtractor::new().with_failure(URL, "model timeout");

        let outcome = Analyzer::new(&repo, &extractor).process_document(&doc).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Failed { reason: "model timeout".into() });

        let doc = repo.document_by_url(URL).unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Failed);
        assert_eq!(doc.error_message.as_deref(), Some("model timeout"));
        assert_eq!(repo.record_count(), 0);
    }

    #[tokio::test]
    async fn test_completed_document_is_skipped() {
        let repo = MemoryRepository::new();
        let doc = pending(&repo, "v1").await;
        repo.update_document(&doc.id, &DocumentPatch::completed(None)).await.unwrap();
        let doc = repo.document_by_url(URL).unwrap();

        let extractor = MockExtractor::new();
        let outcome = Analyzer::new(&repo, &extractor).process_document(&doc).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Skipped);
        assert_eq!(extractor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_update_passes_previous_fields_as_hints() {
        let repo = MemoryRepository::new();
        let doc = pending(&repo, "v1").await;
        let extractor = MockExtractor::new().with_fields(URL, StructuredFields::default().with_title("A"));
        let analyzer = Analyzer::new(&repo, &extractor);
        analyzer.process_document(&doc).await.unwrap();

        let doc = repo.document_by_url(URL).unwrap();
        repo.update_document(
            &doc.id,
            &DocumentPatch::changed(&doc, ContentHash::of("v2"), "v2", Utc::now()),
        )
        .await
        .unwrap();
        let doc = repo.document_by_url(URL).unwrap();

        let outcome = analyzer.process_document(&doc).await.unwrap();
        assert!(matches!(
            outcome,
            AnalysisOutcome::Reconciled(ReconcileOutcome::NoChange { .. })
        ));

        let requests = extractor.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].previous.as_ref().and_then(|f| f.title.as_deref()),
            Some("A")
        );
        assert_eq!(requests[1].content, "v2");
    }

    #[tokio::test]
    async fn test_process_pending_counts_outcomes() {
        let repo = MemoryRepository::new();
        pending(&repo, "v1").await;
        repo.create_document(&NewDocument::first_sighting(
            "https://example.com/p/2",
            "Example",
            ContentHash::of("x"),
            "x",
            Utc::now(),
        ))
        .await
        .unwrap();

        let extractor = MockExtractor::new()
            .with_fields(URL, StructuredFields::default().with_title("A"))
            .with_failure("https://example.com/p/2", "unreadable");

        let summary = Analyzer::new(&repo, &extractor).process_pending(10).await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_link_failure_is_reported() {
        let repo = MemoryRepository::new();
        let doc = pending(&repo, "v1").await;
        repo.fail_updates_for(URL);
        let extractor = MockExtractor::new().with_fields(URL, StructuredFields::default().with_title("A"));

        let result = Analyzer::new(&repo, &extractor).process_document(&doc).await;
        assert!(result.is_err());
        // the record stays; no rollback
        assert_eq!(repo.record_count(), 1);
    }
}
