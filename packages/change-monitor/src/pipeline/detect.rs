//! Classify fetched content against the stored document.
//!
//! Identity is the URL (within a source); equality is the content hash.
//! Looking documents up by hash alone could not tell "same page, new
//! content" apart from "new page".

use tracing::debug;

use crate::error::Result;
use crate::traits::store::DocumentStore;
use crate::types::document::ContentHash;
use crate::types::report::{ChangeStatus, Classification};

pub struct ChangeDetector<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    source_name: &'a str,
}

impl<'a, S: DocumentStore + ?Sized> ChangeDetector<'a, S> {
    pub fn new(store: &'a S, source_name: &'a str) -> Self {
        Self { store, source_name }
    }

    /// Classify `new_hash` for `url`.
    ///
    /// Backend read errors propagate; a failed lookup is never treated as
    /// `New`, which would create a duplicate document.
    pub async fn classify(&self, url: &str, new_hash: &ContentHash) -> Result<Classification> {
        let existing = self
            .store
            .find_document_by_url(self.source_name, url)
            .await?;

        let classification = match existing {
            None => Classification::new_document(),
            Some(doc) if &doc.content_hash == new_hash => Classification {
                status: ChangeStatus::Unchanged,
                existing: Some(doc),
                previous_hash: None,
            },
            Some(doc) => Classification {
                status: ChangeStatus::Changed,
                previous_hash: Some(doc.content_hash.clone()),
                existing: Some(doc),
            },
        };

        debug!(
            url = %url,
            source = %self.source_name,
            status = %classification.status,
            "Document classified"
        );

        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryRepository;
    use crate::traits::store::DocumentStore;
    use crate::types::document::{DocumentPatch, NewDocument};
    use chrono::Utc;

    const URL: &str = "https://example.com/programs/1";

    #[tokio::test]
    async fn test_classify_new_unchanged_changed() {
        let repo = MemoryRepository::new();
        let detector = ChangeDetector::new(&repo, "Example");

        let v1 = ContentHash::of("v1");
        let result = detector.classify(URL, &v1).await.unwrap();
        assert_eq!(result.status, ChangeStatus::New);
        assert!(result.existing.is_none());

        let doc = repo
            .create_document(&NewDocument::first_sighting(URL, "Example", v1.clone(), "v1", Utc::now()))
            .await
            .unwrap();

        let result = detector.classify(URL, &v1).await.unwrap();
        assert_eq!(result.status, ChangeStatus::Unchanged);
        assert_eq!(result.existing_id(), Some(&doc.id));
        assert!(result.previous_hash.is_none());

        let v2 = ContentHash::of("v2");
        let result = detector.classify(URL, &v2).await.unwrap();
        assert_eq!(result.status, ChangeStatus::Changed);
        assert_eq!(result.previous_hash, Some(v1));
    }

    #[tokio::test]
    async fn test_classify_is_idempotent() {
        let repo = MemoryRepository::new();
        let hash = ContentHash::of("v1");
        let doc = repo
            .create_document(&NewDocument::first_sighting(URL, "Example", hash.clone(), "v1", Utc::now()))
            .await
            .unwrap();
        repo.update_document(&doc.id, &DocumentPatch::completed(None))
            .await
            .unwrap();

        let detector = ChangeDetector::new(&repo, "Example");
        for _ in 0..2 {
            let result = detector.classify(URL, &hash).await.unwrap();
            assert_eq!(result.status, ChangeStatus::Unchanged);
        }
    }

    #[tokio::test]
    async fn test_same_url_in_other_source_is_new() {
        let repo = MemoryRepository::new();
        let hash = ContentHash::of("v1");
        repo.create_document(&NewDocument::first_sighting(URL, "Other", hash.clone(), "v1", Utc::now()))
            .await
            .unwrap();

        let detector = ChangeDetector::new(&repo, "Example");
        assert_eq!(detector.classify(URL, &hash).await.unwrap().status, ChangeStatus::New);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let repo = MemoryRepository::new();
        repo.fail_reads(true);

        let detector = ChangeDetector::new(&repo, "Example");
        assert!(detector.classify(URL, &ContentHash::of("v1")).await.is_err());
    }
}
