//! Versioned records - structured snapshots of a document's interpretation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::document::{MonitoredDocument, RecordId};

/// Publication state of a versioned record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Published => "published",
            RecordStatus::Archived => "archived",
        })
    }
}

/// Domain fields produced by the extraction collaborator.
///
/// The core only ever compares the allow-listed fields (see
/// [`crate::pipeline::version::SIGNIFICANT_FIELDS`]); everything else is
/// carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_provider_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_amount_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_amount_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_amount_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_period_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_period_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligibility_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_relevant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Collaborator-specific fields the core does not know about.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StructuredFields {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// One immutable structured-data snapshot in a document's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub id: RecordId,
    pub version: u32,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub status: RecordStatus,
    #[serde(default)]
    pub previous_version_id: Option<RecordId>,
    #[serde(default)]
    pub change_summary: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub requires_review: bool,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub document_id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: StructuredFields,
}

/// Fields written when a versioned record is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord {
    pub version: u32,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,
    pub requires_review: bool,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub document_id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: StructuredFields,
}

impl NewRecord {
    /// Version 1 of a document's interpretation.
    pub fn initial(document: &MonitoredDocument, fields: StructuredFields) -> Self {
        Self {
            version: 1,
            status: RecordStatus::Draft,
            previous_version_id: None,
            change_summary: None,
            requires_review: false,
            source: Some(document.source_name.clone()),
            source_url: Some(document.url.clone()),
            document_id: Some(document.id.clone()),
            fields,
        }
    }

    /// The version following `previous`. Always a draft awaiting review.
    pub fn successor(
        previous: &VersionedRecord,
        document: &MonitoredDocument,
        fields: StructuredFields,
        change_summary: String,
    ) -> Self {
        Self {
            version: previous.version + 1,
            status: RecordStatus::Draft,
            previous_version_id: Some(previous.id.clone()),
            change_summary: Some(change_summary),
            requires_review: true,
            source: Some(document.source_name.clone()),
            source_url: Some(document.url.clone()),
            document_id: Some(document.id.clone()),
            fields,
        }
    }

    /// The stored form of this record under the given id.
    pub fn into_record(self, id: RecordId) -> VersionedRecord {
        VersionedRecord {
            id,
            version: self.version,
            status: self.status,
            previous_version_id: self.previous_version_id,
            change_summary: self.change_summary,
            requires_review: self.requires_review,
            source: self.source,
            source_url: self.source_url,
            document_id: self.document_id,
            fields: self.fields,
        }
    }
}
