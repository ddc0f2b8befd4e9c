//! Version chain management.
//!
//! A changed document is re-extracted and its new fields compared with the
//! current record over a fixed allow-list. Any difference there creates a
//! successor version: a draft awaiting review, linked to its predecessor.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::traits::store::VersionStore;
use crate::types::document::{MonitoredDocument, RecordId};
use crate::types::record::{NewRecord, StructuredFields};
use crate::types::report::ReconcileOutcome;

/// Fields whose change warrants a new version, with their summary labels.
pub const SIGNIFICANT_FIELDS: &[(&str, &str)] = &[
    ("title", "Title"),
    ("funding_amount_min", "Min funding amount"),
    ("funding_amount_max", "Max funding amount"),
    ("application_deadline", "Application deadline"),
    ("funding_period_end", "Funding period end"),
    ("eligibility_criteria", "Eligibility criteria"),
    ("funding_rate", "Funding rate"),
    ("deadline_type", "Deadline type"),
    ("is_relevant", "Relevance status"),
];

/// One allow-listed field that differs between two interpretations.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: &'static str,
    pub label: &'static str,
    pub old: Value,
    pub new: Value,
}

fn significant_value(fields: &StructuredFields, field: &str) -> Value {
    match field {
        "title" => json!(fields.title),
        "funding_amount_min" => json!(fields.funding_amount_min),
        "funding_amount_max" => json!(fields.funding_amount_max),
        "application_deadline" => json!(fields.application_deadline),
        "funding_period_end" => json!(fields.funding_period_end),
        "eligibility_criteria" => json!(fields.eligibility_criteria),
        "funding_rate" => json!(fields.funding_rate),
        "deadline_type" => json!(fields.deadline_type),
        "is_relevant" => json!(fields.is_relevant),
        _ => Value::Null,
    }
}

/// Allow-listed fields that differ. Both-null is not a change.
pub fn detect_significant_changes(old: &StructuredFields, new: &StructuredFields) -> Vec<FieldChange> {
    SIGNIFICANT_FIELDS
        .iter()
        .filter_map(|&(field, label)| {
            let old_value = significant_value(old, field);
            let new_value = significant_value(new, field);
            if old_value.is_null() && new_value.is_null() {
                return None;
            }
            (old_value != new_value).then(|| FieldChange {
                field,
                label,
                old: old_value,
                new: new_value,
            })
        })
        .collect()
}

/// Semicolon-joined labels, e.g. `"Title changed; Funding rate changed"`.
pub fn change_summary(changes: &[FieldChange]) -> String {
    changes
        .iter()
        .map(|change| format!("{} changed", change.label))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Creates records and extends version chains.
pub struct VersionManager<'a, S: VersionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: VersionStore + ?Sized> VersionManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Version 1 of a document's interpretation.
    pub async fn create_initial(
        &self,
        document: &MonitoredDocument,
        fields: StructuredFields,
    ) -> Result<RecordId> {
        let record = NewRecord::initial(document, fields);
        let id = self.store.create_record(&record).await?;
        info!(url = %document.url, record_id = %id, "Created version 1");
        Ok(id)
    }

    /// Reconcile new fields with the document's current record.
    ///
    /// A missing predecessor (no id, or the id no longer resolves) degrades
    /// to a fresh version-1 record instead of failing.
    pub async fn reconcile(
        &self,
        existing_record_id: Option<&RecordId>,
        document: &MonitoredDocument,
        new_fields: StructuredFields,
    ) -> Result<ReconcileOutcome> {
        let Some(existing_id) = existing_record_id else {
            warn!(url = %document.url, "No current record for changed document, creating version 1");
            let record_id = self.create_initial(document, new_fields).await?;
            return Ok(ReconcileOutcome::Fresh { record_id });
        };

        let Some(previous) = self.store.get_record(existing_id).await? else {
            warn!(
                url = %document.url,
                record_id = %existing_id,
                "Current record not found, creating version 1"
            );
            let record_id = self.create_initial(document, new_fields).await?;
            return Ok(ReconcileOutcome::Fresh { record_id });
        };

        let changes = detect_significant_changes(&previous.fields, &new_fields);
        if changes.is_empty() {
            debug!(url = %document.url, record_id = %previous.id, "No significant changes");
            return Ok(ReconcileOutcome::NoChange {
                record_id: previous.id,
            });
        }

        for change in &changes {
            debug!(field = change.field, old = %change.old, new = %change.new, "Field changed");
        }

        let summary = change_summary(&changes);
        let record = NewRecord::successor(&previous, document, new_fields, summary.clone());
        let version = record.version;
        let record_id = self.store.create_record(&record).await?;

        info!(
            url = %document.url,
            record_id = %record_id,
            previous_version_id = %previous.id,
            version,
            changes = %summary,
            "Created new version"
        );

        Ok(ReconcileOutcome::NewVersion {
            record_id,
            version,
            previous_version_id: previous.id,
            change_summary: summary,
        })
    }
}
