//! Content change detection and versioning for monitored web documents.
//!
//! Tracks a set of external documents (funding programs, events) per
//! source and decides on every pass whether each one is new, unchanged,
//! changed or gone. It then drives a versioned record store: new documents
//! get a first record, changed documents a successor version flagged for
//! review, unchanged documents only a fresh timestamp.
//!
//! # Usage
//!
//! ```rust,ignore
//! use change_monitor::{MemoryRepository, MonitorConfig, RunCoordinator, SourceDefinition};
//! use change_monitor::testing::{MockExtractor, MockFetcher};
//!
//! let fetcher = MockFetcher::new()
//!     .with_listing("Example", &["https://example.com/p/1"])
//!     .with_page("https://example.com/p/1", "v1");
//!
//! let coordinator = RunCoordinator::new(MemoryRepository::new(), fetcher, MonitorConfig::new())
//!     .with_extractor(MockExtractor::new());
//!
//! let summary = coordinator
//!     .run(&[SourceDefinition::listing("Example", "https://example.com")])
//!     .await?;
//! println!("{}", summary);
//! ```
//!
//! # Modules
//!
//! - [`types`] - Documents, records, configuration and run summaries
//! - [`traits`] - Backend, fetcher and extractor seams
//! - [`cache`] - Page cache and per-run hash index
//! - [`pipeline`] - Detection, versioning, removal sweep, coordination
//! - [`stores`] - Memory, Directus and dry-run backends
//! - [`fetchers`] - HTTP fetcher and source lister
//! - [`extractors`] - HTTP extraction client
//! - [`testing`] - Mock collaborators

pub mod cache;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{FetchError, FetchResult, MonitorError, Result};
pub use traits::{
    extractor::{ExtractionFailure, ExtractionRequest, Extractor, NoExtractor},
    fetcher::{FetchedPage, PageFetcher, SourceLister},
    store::{DocumentStore, RecordRepository, VersionStore},
};
pub use types::{
    config::{Collections, MonitorConfig, SafetyBuffer, SourceDefinition, SourceKind, SourcesFile},
    document::{
        ContentHash, DocumentPatch, MonitoredDocument, NewDocument, ProcessingStatus, RecordId,
    },
    record::{NewRecord, RecordStatus, StructuredFields, VersionedRecord},
    report::{
        AnalysisOutcome, AnalyzeSummary, ChangeStatus, Classification, ReconcileOutcome,
        RunSummary, SourceSummary, SweepReport,
    },
};

pub use cache::{normalize_content, HashIndex, PageCache};
pub use pipeline::{
    change_summary, detect_significant_changes, Analyzer, ChangeDetector, FieldChange,
    RemovalSweeper, RunCoordinator, VersionManager, SIGNIFICANT_FIELDS,
};

pub use extractors::HttpExtractor;
pub use fetchers::HttpFetcher;
pub use stores::{DirectusRepository, DryRunRepository, MemoryRepository};
