//! In-memory record backend for testing and development.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use crate::error::{MonitorError, Result};
use crate::traits::store::{DocumentStore, VersionStore};
use crate::types::document::{
    ContentHash, DocumentPatch, MonitoredDocument, NewDocument, ProcessingStatus, RecordId,
};
use crate::types::record::{NewRecord, RecordStatus, VersionedRecord};

/// In-memory storage for documents and versioned records.
///
/// Data is lost when dropped. Failure switches let tests simulate an
/// unreachable or misbehaving backend.
pub struct MemoryRepository {
    documents: RwLock<HashMap<RecordId, MonitoredDocument>>,
    records: RwLock<HashMap<RecordId, VersionedRecord>>,
    next_id: AtomicU64,
    fail_reads: AtomicBool,
    unavailable: AtomicBool,
    failing_urls: RwLock<HashSet<String>>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_reads: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
            failing_urls: RwLock::new(HashSet::new()),
        }
    }

    fn next_id(&self) -> RecordId {
        RecordId(self.next_id.fetch_add(1, Ordering::SeqCst).to_string())
    }

    /// Make every read fail with a (non-fatal) backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every call fail as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make updates of the document with this URL fail.
    pub fn fail_updates_for(&self, url: impl Into<String>) {
        self.failing_urls.write().unwrap().insert(url.into());
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MonitorError::BackendUnavailable("memory backend offline".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        self.check_available()?;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(MonitorError::Backend("simulated read failure".into()));
        }
        Ok(())
    }

    /// Insert a document as-is, e.g. with back-dated timestamps.
    pub fn insert_document(&self, document: MonitoredDocument) {
        self.documents
            .write()
            .unwrap()
            .insert(document.id.clone(), document);
    }

    /// Insert a record as-is.
    pub fn insert_record(&self, record: VersionedRecord) {
        self.records.write().unwrap().insert(record.id.clone(), record);
    }

    /// Delete a record, to simulate a broken version chain.
    pub fn remove_record(&self, id: &RecordId) -> Option<VersionedRecord> {
        self.records.write().unwrap().remove(id)
    }

    pub fn document_by_url(&self, url: &str) -> Option<MonitoredDocument> {
        self.documents
            .read()
            .unwrap()
            .values()
            .find(|doc| doc.url == url)
            .cloned()
    }

    pub fn documents(&self) -> Vec<MonitoredDocument> {
        let mut docs: Vec<_> = self.documents.read().unwrap().values().cloned().collect();
        docs.sort_by(|a, b| a.scraped_at.cmp(&b.scraped_at).then_with(|| a.url.cmp(&b.url)));
        docs
    }

    /// All records, oldest version first within each chain.
    pub fn records(&self) -> Vec<VersionedRecord> {
        let mut records: Vec<_> = self.records.read().unwrap().values().cloned().collect();
        records.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.id.0.cmp(&b.id.0)));
        records
    }

    pub fn document_count(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for MemoryRepository {
    async fn find_document_by_url(
        &self,
        source_name: &str,
        url: &str,
    ) -> Result<Option<MonitoredDocument>> {
        self.check_read()?;
        Ok(self
            .documents
            .read()
            .unwrap()
            .values()
            .find(|doc| doc.source_name == source_name && doc.url == url)
            .cloned())
    }

    async fn find_document_by_hash(&self, hash: &ContentHash) -> Result<Option<MonitoredDocument>> {
        self.check_read()?;
        Ok(self
            .documents
            .read()
            .unwrap()
            .values()
            .find(|doc| &doc.content_hash == hash)
            .cloned())
    }

    async fn get_document(&self, id: &RecordId) -> Result<Option<MonitoredDocument>> {
        self.check_read()?;
        Ok(self.documents.read().unwrap().get(id).cloned())
    }

    async fn create_document(&self, document: &NewDocument) -> Result<MonitoredDocument> {
        self.check_available()?;
        let stored = document.clone().into_document(self.next_id());
        self.insert_document(stored.clone());
        Ok(stored)
    }

    async fn update_document(&self, id: &RecordId, patch: &DocumentPatch) -> Result<()> {
        self.check_available()?;
        let mut documents = self.documents.write().unwrap();
        let doc = documents.get_mut(id).ok_or_else(|| MonitorError::InvalidRecord {
            collection: "documents".into(),
            reason: format!("no document with id {}", id),
        })?;

        if self.failing_urls.read().unwrap().contains(&doc.url) {
            return Err(MonitorError::Backend(
                format!("simulated update failure for {}", doc.url).into(),
            ));
        }

        patch.apply_to(doc);
        Ok(())
    }

    async fn list_active_documents(&self, source_name: &str) -> Result<Vec<MonitoredDocument>> {
        self.check_read()?;
        Ok(self
            .documents()
            .into_iter()
            .filter(|doc| doc.is_active && doc.source_name == source_name)
            .collect())
    }

    async fn list_documents_by_status(
        &self,
        status: ProcessingStatus,
        limit: usize,
    ) -> Result<Vec<MonitoredDocument>> {
        self.check_read()?;
        Ok(self
            .documents()
            .into_iter()
            .filter(|doc| doc.processing_status == status)
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl VersionStore for MemoryRepository {
    async fn get_record(&self, id: &RecordId) -> Result<Option<VersionedRecord>> {
        self.check_read()?;
        Ok(self.records.read().unwrap().get(id).cloned())
    }

    async fn create_record(&self, record: &NewRecord) -> Result<RecordId> {
        self.check_available()?;
        let id = self.next_id();
        self.insert_record(record.clone().into_record(id.clone()));
        Ok(id)
    }

    async fn update_record_status(&self, id: &RecordId, status: RecordStatus) -> Result<()> {
        self.check_available()?;
        let mut records = self.records.write().unwrap();
        let record = records.get_mut(id).ok_or_else(|| MonitorError::InvalidRecord {
            collection: "records".into(),
            reason: format!("no record with id {}", id),
        })?;
        record.status = status;
        Ok(())
    }
}
