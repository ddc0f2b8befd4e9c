//! Record backend traits.
//!
//! The backend is split into two focused traits:
//! - `DocumentStore`: one record per monitored URL
//! - `VersionStore`: the versioned structured records
//! - `RecordRepository`: composite of both

use async_trait::async_trait;

use crate::error::Result;
use crate::types::document::{
    ContentHash, DocumentPatch, MonitoredDocument, NewDocument, ProcessingStatus, RecordId,
};
use crate::types::record::{NewRecord, RecordStatus, VersionedRecord};

/// Storage for monitored documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find the document for a URL within a source.
    async fn find_document_by_url(
        &self,
        source_name: &str,
        url: &str,
    ) -> Result<Option<MonitoredDocument>>;

    /// Find any document whose current content has this hash.
    async fn find_document_by_hash(&self, hash: &ContentHash) -> Result<Option<MonitoredDocument>>;

    async fn get_document(&self, id: &RecordId) -> Result<Option<MonitoredDocument>>;

    /// Create a document and return it with its backend id.
    async fn create_document(&self, document: &NewDocument) -> Result<MonitoredDocument>;

    /// Write only the fields set in `patch`.
    async fn update_document(&self, id: &RecordId, patch: &DocumentPatch) -> Result<()>;

    /// All documents of a source with `is_active = true`.
    async fn list_active_documents(&self, source_name: &str) -> Result<Vec<MonitoredDocument>>;

    /// Documents in a processing state, oldest `scraped_at` first.
    async fn list_documents_by_status(
        &self,
        status: ProcessingStatus,
        limit: usize,
    ) -> Result<Vec<MonitoredDocument>>;
}

/// Storage for versioned records.
///
/// Records are never deleted; only their status moves.
#[async_trait]
pub trait VersionStore: Send + Sync {
    async fn get_record(&self, id: &RecordId) -> Result<Option<VersionedRecord>>;

    /// Create a record and return its backend id.
    async fn create_record(&self, record: &NewRecord) -> Result<RecordId>;

    async fn update_record_status(&self, id: &RecordId, status: RecordStatus) -> Result<()>;
}

/// Composite backend trait.
///
/// This is the main trait used by the pipeline.
pub trait RecordRepository: DocumentStore + VersionStore {}

impl<T: DocumentStore + VersionStore> RecordRepository for T {}
