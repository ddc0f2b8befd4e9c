//! Monitored documents - one tracked URL within one source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque backend identifier.
///
/// Directus hands out integer or UUID primary keys depending on the
/// collection, so both JSON numbers and strings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => RecordId(s),
            RawId::Number(n) => RecordId(n.to_string()),
        })
    }
}

/// Hex-encoded SHA-256 digest of raw content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Hash content exactly as given (case and whitespace sensitive).
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a document is in the scrape → extract pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// First sighting, awaiting extraction
    Pending,
    /// Content changed, awaiting re-extraction
    PendingUpdate,
    Completed,
    Failed,
    /// No longer listed by its source
    Removed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::PendingUpdate => "pending_update",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
            ProcessingStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracked identity of one external URL within one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredDocument {
    pub id: RecordId,
    pub url: String,
    pub source_name: String,
    pub content_hash: ContentHash,
    #[serde(default)]
    pub previous_content_hash: Option<ContentHash>,

    /// Payload handed to the extraction collaborator; opaque to the core.
    #[serde(default)]
    pub raw_content: Option<String>,

    #[serde(deserialize_with = "super::timestamp::required")]
    pub scraped_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "super::timestamp::lenient")]
    pub last_checked_at: Option<DateTime<Utc>>,
    /// `None` when missing or unparseable.
    #[serde(default, deserialize_with = "super::timestamp::lenient")]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "super::timestamp::lenient")]
    pub change_detected_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "super::null_as_default")]
    pub check_count: u32,
    pub is_active: bool,
    pub processing_status: ProcessingStatus,
    #[serde(default)]
    pub error_message: Option<String>,

    /// Current versioned record for this document.
    #[serde(default)]
    pub record_id: Option<RecordId>,
}

/// Fields written when a document is first seen.
#[derive(Debug, Clone, Serialize)]
pub struct NewDocument {
    pub url: String,
    pub source_name: String,
    pub content_hash: ContentHash,
    pub raw_content: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub last_checked_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub check_count: u32,
    pub is_active: bool,
    pub processing_status: ProcessingStatus,
}

impl NewDocument {
    /// A freshly sighted document, awaiting extraction.
    pub fn first_sighting(
        url: impl Into<String>,
        source_name: impl Into<String>,
        content_hash: ContentHash,
        raw_content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            source_name: source_name.into(),
            content_hash,
            raw_content: Some(raw_content.into()),
            scraped_at: now,
            last_checked_at: now,
            last_seen_at: now,
            check_count: 1,
            is_active: true,
            processing_status: ProcessingStatus::Pending,
        }
    }

    /// The stored form of this document under the given id.
    pub fn into_document(self, id: RecordId) -> MonitoredDocument {
        MonitoredDocument {
            id,
            url: self.url,
            source_name: self.source_name,
            content_hash: self.content_hash,
            previous_content_hash: None,
            raw_content: self.raw_content,
            scraped_at: self.scraped_at,
            last_checked_at: Some(self.last_checked_at),
            last_seen_at: Some(self.last_seen_at),
            change_detected_at: None,
            check_count: self.check_count,
            is_active: self.is_active,
            processing_status: self.processing_status,
            error_message: None,
            record_id: None,
        }
    }
}

/// Partial update of a document. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_content_hash: Option<ContentHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_detected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<ProcessingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
}

impl DocumentPatch {
    /// Re-stamp an unchanged document without touching its content.
    ///
    /// A document that was marked removed and is listed again is
    /// reactivated.
    pub fn unchanged(document: &MonitoredDocument, now: DateTime<Utc>) -> Self {
        let mut patch = Self {
            last_checked_at: Some(now),
            last_seen_at: Some(now),
            check_count: Some(document.check_count + 1),
            ..Self::default()
        };
        if !document.is_active {
            patch.is_active = Some(true);
            patch.processing_status = Some(if document.record_id.is_some() {
                ProcessingStatus::Completed
            } else {
                ProcessingStatus::Pending
            });
        }
        patch
    }

    /// Record new content and flag the document for re-extraction.
    pub fn changed(
        document: &MonitoredDocument,
        new_hash: ContentHash,
        raw_content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            previous_content_hash: Some(document.content_hash.clone()),
            content_hash: Some(new_hash),
            raw_content: Some(raw_content.into()),
            scraped_at: Some(now),
            last_checked_at: Some(now),
            last_seen_at: Some(now),
            change_detected_at: Some(now),
            check_count: Some(document.check_count + 1),
            is_active: (!document.is_active).then_some(true),
            processing_status: Some(ProcessingStatus::PendingUpdate),
            ..Self::default()
        }
    }

    /// Soft-delete a document that its source no longer lists.
    pub fn removed(now: DateTime<Utc>) -> Self {
        Self {
            is_active: Some(false),
            processing_status: Some(ProcessingStatus::Removed),
            last_checked_at: Some(now),
            ..Self::default()
        }
    }

    /// Extraction finished; optionally point at a new current record.
    pub fn completed(record_id: Option<RecordId>) -> Self {
        Self {
            processing_status: Some(ProcessingStatus::Completed),
            record_id,
            ..Self::default()
        }
    }

    /// Extraction failed; keep the reason for manual follow-up.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            processing_status: Some(ProcessingStatus::Failed),
            error_message: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Apply this patch to an in-memory document.
    pub fn apply_to(&self, document: &mut MonitoredDocument) {
        if let Some(hash) = &self.content_hash {
            document.content_hash = hash.clone();
        }
        if let Some(hash) = &self.previous_content_hash {
            document.previous_content_hash = Some(hash.clone());
        }
        if let Some(raw) = &self.raw_content {
            document.raw_content = Some(raw.clone());
        }
        if let Some(at) = self.scraped_at {
            document.scraped_at = at;
        }
        if let Some(at) = self.last_checked_at {
            document.last_checked_at = Some(at);
        }
        if let Some(at) = self.last_seen_at {
            document.last_seen_at = Some(at);
        }
        if let Some(at) = self.change_detected_at {
            document.change_detected_at = Some(at);
        }
        if let Some(count) = self.check_count {
            document.check_count = count;
        }
        if let Some(active) = self.is_active {
            document.is_active = active;
        }
        if let Some(status) = self.processing_status {
            document.processing_status = status;
        }
        if let Some(message) = &self.error_message {
            document.error_message = Some(message.clone());
        }
        if let Some(id) = &self.record_id {
            document.record_id = Some(id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> MonitoredDocument {
        NewDocument::first_sighting(
            "https://example.com/programs/1",
            "Example",
            ContentHash::of("v1"),
            "v1",
            Utc::now(),
        )
        .into_document(RecordId::new("1"))
    }

    #[test]
    fn test_record_id_accepts_numbers_and_strings() {
        let from_number: RecordId = serde_json::from_str("42").unwrap();
        let from_string: RecordId = serde_json::from_str("\"0190-abc\"").unwrap();
        assert_eq!(from_number, RecordId::new("42"));
        assert_eq!(from_string.as_str(), "0190-abc");
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        let hash = ContentHash::of("");
        assert_eq!(
            hash.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_first_sighting_defaults() {
        let doc = document();
        assert_eq!(doc.check_count, 1);
        assert!(doc.is_active);
        assert_eq!(doc.processing_status, ProcessingStatus::Pending);
        assert!(doc.previous_content_hash.is_none());
    }

    #[test]
    fn test_unchanged_patch_never_touches_hashes() {
        let doc = document();
        let patch = DocumentPatch::unchanged(&doc, Utc::now());
        assert!(patch.content_hash.is_none());
        assert!(patch.previous_content_hash.is_none());
        assert_eq!(patch.check_count, Some(2));

        let json = serde_json::to_value(&patch).unwrap();
        assert!(json.get("previous_content_hash").is_none());
    }

    #[test]
    fn test_changed_patch_keeps_prior_hash() {
        let mut doc = document();
        let patch = DocumentPatch::changed(&doc, ContentHash::of("v2"), "v2", Utc::now());
        patch.apply_to(&mut doc);

        assert_eq!(doc.content_hash, ContentHash::of("v2"));
        assert_eq!(doc.previous_content_hash, Some(ContentHash::of("v1")));
        assert_eq!(doc.processing_status, ProcessingStatus::PendingUpdate);
        assert_eq!(doc.check_count, 2);
    }

    #[test]
    fn test_unchanged_patch_reactivates_removed_document() {
        let mut doc = document();
        DocumentPatch::removed(Utc::now()).apply_to(&mut doc);
        assert!(!doc.is_active);

        DocumentPatch::unchanged(&doc, Utc::now()).apply_to(&mut doc);
        assert!(doc.is_active);
        assert_eq!(doc.processing_status, ProcessingStatus::Pending);
        assert!(doc.previous_content_hash.is_none());
    }

    #[test]
    fn test_document_tolerates_bad_last_seen() {
        let json = serde_json::json!({
            "id": 12,
            "url": "https://example.com/p",
            "source_name": "Example",
            "content_hash": "abc",
            "scraped_at": "2025-03-01T08:00:00",
            "last_seen_at": "not a date",
            "check_count": null,
            "is_active": true,
            "processing_status": "completed"
        });

        let doc: MonitoredDocument = serde_json::from_value(json).unwrap();
        assert!(doc.last_seen_at.is_none());
        assert_eq!(doc.check_count, 0);
        assert_eq!(doc.id, RecordId::new("12"));
    }

    #[test]
    fn test_document_with_unknown_status_is_rejected() {
        let json = serde_json::json!({
            "id": 1,
            "url": "https://example.com/p",
            "source_name": "Example",
            "content_hash": "abc",
            "scraped_at": "2025-03-01T08:00:00Z",
            "is_active": true,
            "processing_status": "archived"
        });

        assert!(serde_json::from_value::<MonitoredDocument>(json).is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ProcessingStatus::PendingUpdate).unwrap();
        assert_eq!(json, "\"pending_update\"");
    }
}
