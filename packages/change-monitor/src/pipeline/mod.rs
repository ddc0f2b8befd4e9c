//! The monitoring pipeline.
//!
//! One pass runs fetch → classify → reconcile for every listed URL of a
//! source, then sweeps documents the source no longer lists:
//! - `detect`: new / unchanged / changed classification
//! - `version`: significant-change detection and the version chain
//! - `sweep`: removal with a safety buffer
//! - `analyze`: extraction and version reconciliation of pending documents
//! - `run`: the coordinator tying them together

pub mod analyze;
pub mod detect;
pub mod run;
pub mod sweep;
pub mod version;

pub use analyze::Analyzer;
pub use detect::ChangeDetector;
pub use run::RunCoordinator;
pub use sweep::RemovalSweeper;
pub use version::{
    change_summary, detect_significant_changes, FieldChange, VersionManager, SIGNIFICANT_FIELDS,
};
