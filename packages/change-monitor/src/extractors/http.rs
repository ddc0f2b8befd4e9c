//! Extraction over HTTP.
//!
//! POSTs an [`ExtractionRequest`] as JSON and expects [`StructuredFields`]
//! back. A body of the form `{"error": "..."}` is an explicit failure.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::traits::extractor::{ExtractionFailure, ExtractionRequest, Extractor};
use crate::types::record::StructuredFields;

pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpExtractor {
    /// Extractor with a 120 second timeout; model-backed extraction is slow.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| MonitorError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn parse_response(body: Value) -> std::result::Result<StructuredFields, ExtractionFailure> {
        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(ExtractionFailure::new(error));
        }

        serde_json::from_value(body)
            .map_err(|e| ExtractionFailure::new(format!("malformed extraction response: {}", e)))
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> std::result::Result<StructuredFields, ExtractionFailure> {
        debug!(url = %request.url, endpoint = %self.endpoint, "Requesting extraction");

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExtractionFailure::new(format!("extraction request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExtractionFailure::new(format!(
                "extraction service returned {}: {}",
                status, text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExtractionFailure::new(format!("invalid extraction response: {}", e)))?;

        Self::parse_response(body)
    }
}
