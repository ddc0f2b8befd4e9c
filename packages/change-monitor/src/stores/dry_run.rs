//! Read-through backend that logs writes instead of performing them.

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::traits::store::{DocumentStore, VersionStore};
use crate::types::document::{
    ContentHash, DocumentPatch, MonitoredDocument, NewDocument, ProcessingStatus, RecordId,
};
use crate::types::record::{NewRecord, RecordStatus, VersionedRecord};

/// Wraps a backend for `--dry-run`: reads pass through, writes are skipped.
///
/// Creates return a synthetic `dry-run-<uuid>` id so the pipeline can run
/// to completion. Nothing created during a dry run can be read back.
pub struct DryRunRepository<R> {
    inner: R,
}

impl<R> DryRunRepository<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn synthetic_id() -> RecordId {
        RecordId(format!("dry-run-{}", uuid::Uuid::new_v4()))
    }
}

#[async_trait]
impl<R: DocumentStore> DocumentStore for DryRunRepository<R> {
    async fn find_document_by_url(
        &self,
        source_name: &str,
        url: &str,
    ) -> Result<Option<MonitoredDocument>> {
        self.inner.find_document_by_url(source_name, url).await
    }

    async fn find_document_by_hash(&self, hash: &ContentHash) -> Result<Option<MonitoredDocument>> {
        self.inner.find_document_by_hash(hash).await
    }

    async fn get_document(&self, id: &RecordId) -> Result<Option<MonitoredDocument>> {
        self.inner.get_document(id).await
    }

    async fn create_document(&self, document: &NewDocument) -> Result<MonitoredDocument> {
        info!(url = %document.url, source = %document.source_name, "[dry run] Would create document");
        Ok(document.clone().into_document(Self::synthetic_id()))
    }

    async fn update_document(&self, id: &RecordId, patch: &DocumentPatch) -> Result<()> {
        info!(
            document_id = %id,
            status = ?patch.processing_status,
            "[dry run] Would update document"
        );
        Ok(())
    }

    async fn list_active_documents(&self, source_name: &str) -> Result<Vec<MonitoredDocument>> {
        self.inner.list_active_documents(source_name).await
    }

    async fn list_documents_by_status(
        &self,
        status: ProcessingStatus,
        limit: usize,
    ) -> Result<Vec<MonitoredDocument>> {
        self.inner.list_documents_by_status(status, limit).await
    }
}

#[async_trait]
impl<R: VersionStore> VersionStore for DryRunRepository<R> {
    async fn get_record(&self, id: &RecordId) -> Result<Option<VersionedRecord>> {
        self.inner.get_record(id).await
    }

    async fn create_record(&self, record: &NewRecord) -> Result<RecordId> {
        info!(
            version = record.version,
            title = record.fields.title.as_deref().unwrap_or("Unknown"),
            change_summary = record.change_summary.as_deref().unwrap_or(""),
            "[dry run] Would create record"
        );
        Ok(Self::synthetic_id())
    }

    async fn update_record_status(&self, id: &RecordId, status: RecordStatus) -> Result<()> {
        info!(record_id = %id, status = %status, "[dry run] Would update record status");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryRepository;
    use chrono::Utc;

    #[tokio::test]
    async fn test_writes_are_skipped_reads_pass_through() {
        let memory = MemoryRepository::new();
        let existing = memory
            .create_document(&NewDocument::first_sighting(
                "https://e.com/a",
                "E",
                ContentHash::of("a"),
                "a",
                Utc::now(),
            ))
            .await
            .unwrap();

        let repo = DryRunRepository::new(memory);
        let found = repo.find_document_by_url("E", "https://e.com/a").await.unwrap();
        assert_eq!(found.as_ref().map(|d| &d.id), Some(&existing.id));

        let created = repo
            .create_document(&NewDocument::first_sighting(
                "https://e.com/b",
                "E",
                ContentHash::of("b"),
                "b",
                Utc::now(),
            ))
            .await
            .unwrap();
        assert!(created.id.as_str().starts_with("dry-run-"));

        repo.update_document(&existing.id, &DocumentPatch::removed(Utc::now()))
            .await
            .unwrap();

        assert_eq!(repo.inner().document_count(), 1);
        assert!(repo.inner().document_by_url("https://e.com/a").unwrap().is_active);
    }
}
