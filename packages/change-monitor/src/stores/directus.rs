//! Directus-backed record repository.
//!
//! Responses are validated into typed records here; malformed items are
//! rejected as [`MonitorError::InvalidRecord`] instead of travelling
//! through the pipeline as loose JSON.

use async_trait::async_trait;
use directus_client::{DirectusClient, Query};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::traits::store::{DocumentStore, VersionStore};
use crate::types::config::Collections;
use crate::types::document::{
    ContentHash, DocumentPatch, MonitoredDocument, NewDocument, ProcessingStatus, RecordId,
};
use crate::types::record::{NewRecord, RecordStatus, VersionedRecord};

pub struct DirectusRepository {
    client: DirectusClient,
    collections: Collections,
}

impl DirectusRepository {
    pub fn new(client: DirectusClient, collections: Collections) -> Self {
        Self {
            client,
            collections,
        }
    }

    pub fn client(&self) -> &DirectusClient {
        &self.client
    }

    fn parse<T: DeserializeOwned>(collection: &str, item: Value) -> Result<T> {
        serde_json::from_value(item).map_err(|e| MonitorError::InvalidRecord {
            collection: collection.to_string(),
            reason: e.to_string(),
        })
    }

    fn parse_all<T: DeserializeOwned>(collection: &str, items: Vec<Value>) -> Result<Vec<T>> {
        items
            .into_iter()
            .map(|item| Self::parse(collection, item))
            .collect()
    }

    fn created_id(collection: &str, created: &Value) -> Result<RecordId> {
        created
            .get("id")
            .cloned()
            .ok_or_else(|| MonitorError::InvalidRecord {
                collection: collection.to_string(),
                reason: "created item has no id".into(),
            })
            .and_then(|id| Self::parse(collection, id))
    }

    async fn find_documents(&self, query: Query) -> Result<Vec<MonitoredDocument>> {
        let collection = &self.collections.documents;
        let items: Vec<Value> = self.client.find_items(collection, &query).await?;
        Self::parse_all(collection, items)
    }
}

#[async_trait]
impl DocumentStore for DirectusRepository {
    async fn find_document_by_url(
        &self,
        source_name: &str,
        url: &str,
    ) -> Result<Option<MonitoredDocument>> {
        let query = Query::new()
            .eq("url", url)
            .eq("source_name", source_name)
            .limit(1);
        Ok(self.find_documents(query).await?.into_iter().next())
    }

    async fn find_document_by_hash(&self, hash: &ContentHash) -> Result<Option<MonitoredDocument>> {
        let query = Query::new().eq("content_hash", hash.as_str()).limit(1);
        Ok(self.find_documents(query).await?.into_iter().next())
    }

    async fn get_document(&self, id: &RecordId) -> Result<Option<MonitoredDocument>> {
        let collection = &self.collections.documents;
        match self.client.get_item(collection, id.as_str()).await? {
            Some(item) => Self::parse(collection, item).map(Some),
            None => Ok(None),
        }
    }

    async fn create_document(&self, document: &NewDocument) -> Result<MonitoredDocument> {
        let collection = &self.collections.documents;
        let created = self.client.create_item(collection, document).await?;
        let id = Self::created_id(collection, &created)?;
        debug!(url = %document.url, document_id = %id, "Document created");
        Ok(document.clone().into_document(id))
    }

    async fn update_document(&self, id: &RecordId, patch: &DocumentPatch) -> Result<()> {
        self.client
            .update_item(&self.collections.documents, id.as_str(), patch)
            .await?;
        Ok(())
    }

    async fn list_active_documents(&self, source_name: &str) -> Result<Vec<MonitoredDocument>> {
        let query = Query::new()
            .eq("source_name", source_name)
            .eq("is_active", true)
            .limit(-1);
        self.find_documents(query).await
    }

    async fn list_documents_by_status(
        &self,
        status: ProcessingStatus,
        limit: usize,
    ) -> Result<Vec<MonitoredDocument>> {
        let query = Query::new()
            .eq("processing_status", status.as_str())
            .sort("scraped_at")
            .limit(i64::try_from(limit).unwrap_or(-1));
        self.find_documents(query).await
    }
}

#[async_trait]
impl VersionStore for DirectusRepository {
    async fn get_record(&self, id: &RecordId) -> Result<Option<VersionedRecord>> {
        let collection = &self.collections.records;
        match self.client.get_item(collection, id.as_str()).await? {
            Some(item) => Self::parse(collection, item).map(Some),
            None => Ok(None),
        }
    }

    async fn create_record(&self, record: &NewRecord) -> Result<RecordId> {
        let collection = &self.collections.records;
        let created = self.client.create_item(collection, record).await?;
        Self::created_id(collection, &created)
    }

    async fn update_record_status(&self, id: &RecordId, status: RecordStatus) -> Result<()> {
        self.client
            .update_item(
                &self.collections.records,
                id.as_str(),
                &serde_json::json!({ "status": status }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_id_accepts_numeric_ids() {
        let id = DirectusRepository::created_id("docs", &json!({ "id": 17, "url": "x" })).unwrap();
        assert_eq!(id, RecordId::new("17"));
    }

    #[test]
    fn test_created_id_requires_id() {
        let err = DirectusRepository::created_id("docs", &json!({ "url": "x" })).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidRecord { .. }));
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        let items = vec![json!({ "id": 1, "url": "https://e.com/a" })];
        let result: Result<Vec<MonitoredDocument>> = DirectusRepository::parse_all("docs", items);
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("invalid docs record"));
    }
}
