//! Outcomes and run summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::document::{ContentHash, MonitoredDocument, RecordId};

/// Three-way classification of freshly fetched content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    New,
    Unchanged,
    Changed,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeStatus::New => "new",
            ChangeStatus::Unchanged => "unchanged",
            ChangeStatus::Changed => "changed",
        })
    }
}

/// Result of comparing fetched content against the stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: ChangeStatus,
    pub existing: Option<MonitoredDocument>,
    /// Stored hash before this fetch; only set for `Changed`.
    pub previous_hash: Option<ContentHash>,
}

impl Classification {
    pub fn new_document() -> Self {
        Self {
            status: ChangeStatus::New,
            existing: None,
            previous_hash: None,
        }
    }

    pub fn existing_id(&self) -> Option<&RecordId> {
        self.existing.as_ref().map(|doc| &doc.id)
    }
}

/// What the version manager did with new structured data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// No allow-listed field differs; the current record stays current.
    NoChange { record_id: RecordId },

    /// A successor version was created.
    NewVersion {
        record_id: RecordId,
        version: u32,
        previous_version_id: RecordId,
        change_summary: String,
    },

    /// No predecessor could be located; a version-1 record was created.
    Fresh { record_id: RecordId },
}

impl ReconcileOutcome {
    /// The record the document should point at afterwards.
    pub fn record_id(&self) -> &RecordId {
        match self {
            ReconcileOutcome::NoChange { record_id }
            | ReconcileOutcome::NewVersion { record_id, .. }
            | ReconcileOutcome::Fresh { record_id } => record_id,
        }
    }
}

/// Result of running one document through extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// First interpretation of a document.
    Created { record_id: RecordId },
    Reconciled(ReconcileOutcome),
    /// Extraction failed; the document is marked failed.
    Failed { reason: String },
    /// Document is not awaiting extraction.
    Skipped,
}

/// Counts from one removal sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Active documents that were not observed in this scan.
    pub unseen: usize,
    pub removed: usize,
    pub within_buffer: usize,
    pub failed: usize,
}

/// Per-source counts for one monitoring pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub listed: usize,
    pub new: usize,
    pub unchanged: usize,
    pub changed: usize,
    /// URLs already reconciled with the same content earlier in this run.
    pub duplicate: usize,
    pub removed: usize,
    pub failed: usize,
    pub extracted: usize,
    pub extraction_failed: usize,
    /// Source-level failure (listing failed); no sweep was run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceSummary {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, status: ChangeStatus) {
        match status {
            ChangeStatus::New => self.new += 1,
            ChangeStatus::Unchanged => self.unchanged += 1,
            ChangeStatus::Changed => self.changed += 1,
        }
    }
}

/// Summary of a complete run across all sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub sources: Vec<SourceSummary>,
}

impl RunSummary {
    pub fn start(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            sources: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total(&self) -> SourceSummary {
        let mut total = SourceSummary::new("total");
        for s in &self.sources {
            total.listed += s.listed;
            total.new += s.new;
            total.unchanged += s.unchanged;
            total.changed += s.changed;
            total.duplicate += s.duplicate;
            total.removed += s.removed;
            total.failed += s.failed;
            total.extracted += s.extracted;
            total.extraction_failed += s.extraction_failed;
        }
        total
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        writeln!(f, "Monitoring run summary{}", if self.dry_run { " (dry run)" } else { "" })?;
        for s in &self.sources {
            match &s.error {
                Some(error) => writeln!(f, "  {}: skipped ({})", s.source, error)?,
                None => writeln!(
                    f,
                    "  {}: {} listed, {} new, {} unchanged, {} changed, {} duplicate, {} removed, {} failed",
                    s.source, s.listed, s.new, s.unchanged, s.changed, s.duplicate, s.removed, s.failed
                )?,
            }
        }
        write!(
            f,
            "Total: {} new, {} unchanged, {} changed, {} removed, {} failed",
            total.new, total.unchanged, total.changed, total.removed, total.failed
        )
    }
}

/// Counts from one `analyze` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzeSummary {
    pub processed: usize,
    pub created: usize,
    pub versioned: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl AnalyzeSummary {
    pub fn record(&mut self, outcome: &AnalysisOutcome) {
        match outcome {
            AnalysisOutcome::Created { .. } | AnalysisOutcome::Reconciled(ReconcileOutcome::Fresh { .. }) => {
                self.created += 1
            }
            AnalysisOutcome::Reconciled(ReconcileOutcome::NewVersion { .. }) => self.versioned += 1,
            AnalysisOutcome::Reconciled(ReconcileOutcome::NoChange { .. }) => self.unchanged += 1,
            AnalysisOutcome::Failed { .. } => self.failed += 1,
            AnalysisOutcome::Skipped => return,
        }
        self.processed += 1;
    }
}

impl fmt::Display for AnalyzeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Analyzed {} documents: {} created, {} new versions, {} without significant change, {} failed",
            self.processed, self.created, self.versioned, self.unchanged, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_summary_totals_across_sources() {
        let mut run = RunSummary::start(false);
        let mut a = SourceSummary::new("A");
        a.record(ChangeStatus::New);
        a.record(ChangeStatus::Changed);
        let mut b = SourceSummary::new("B");
        b.record(ChangeStatus::Unchanged);
        b.removed = 2;
        run.sources = vec![a, b];

        let total = run.total();
        assert_eq!((total.new, total.changed, total.unchanged, total.removed), (1, 1, 1, 2));

        let rendered = run.to_string();
        assert!(rendered.contains("A: 0 listed, 1 new"));
        assert!(rendered.ends_with("Total: 1 new, 1 unchanged, 1 changed, 2 removed, 0 failed"));
    }

    #[test]
    fn test_analyze_summary_ignores_skipped() {
        let mut summary = AnalyzeSummary::default();
        summary.record(&AnalysisOutcome::Skipped);
        summary.record(&AnalysisOutcome::Failed { reason: "timeout".into() });
        summary.record(&AnalysisOutcome::Reconciled(ReconcileOutcome::Fresh {
            record_id: RecordId::new("9"),
        }));
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
    }
}
