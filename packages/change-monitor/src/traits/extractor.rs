//! Extraction collaborator.
//!
//! Turns raw content into structured fields. The core never looks inside
//! the result except for the allow-listed fields compared by the version
//! manager.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::record::StructuredFields;

/// Input handed to the extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub url: String,
    pub source_name: String,
    pub content: String,

    /// Fields of the current record, as hints for re-extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<StructuredFields>,
}

/// Explicit failure reported by an extractor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct ExtractionFailure {
    pub reason: String,
}

impl ExtractionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> std::result::Result<StructuredFields, ExtractionFailure>;
}

/// Placeholder for runs without an extraction collaborator.
///
/// New and changed documents then stay pending until an `analyze` pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtractor;

#[async_trait]
impl Extractor for NoExtractor {
    async fn extract(
        &self,
        _request: &ExtractionRequest,
    ) -> std::result::Result<StructuredFields, ExtractionFailure> {
        Err(ExtractionFailure::new("no extractor configured"))
    }
}
