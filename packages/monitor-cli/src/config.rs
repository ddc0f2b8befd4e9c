use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::Path;
use tracing::info;

use change_monitor::{Collections, SafetyBuffer, SourceDefinition, SourcesFile};
use directus_client::{Auth, DirectusConfig};

/// Runtime configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub directus: DirectusConfig,
    pub extractor_url: Option<String>,
    pub extractor_api_key: Option<String>,
    pub safety_buffer: SafetyBuffer,
    pub collections: Collections,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = var("DIRECTUS_URL").context("DIRECTUS_URL must be set")?;

        let auth = match (var("DIRECTUS_TOKEN"), var("DIRECTUS_EMAIL"), var("DIRECTUS_PASSWORD")) {
            (Some(token), _, _) => Auth::token(token),
            (None, Some(email), Some(password)) => Auth::credentials(email, password),
            _ => bail!("DIRECTUS_TOKEN or DIRECTUS_EMAIL and DIRECTUS_PASSWORD must be set"),
        };

        let safety_buffer = match var("MONITOR_SAFETY_BUFFER_DAYS") {
            Some(days) => SafetyBuffer::days(
                days.trim()
                    .parse()
                    .context("MONITOR_SAFETY_BUFFER_DAYS must be a whole number of days")?,
            ),
            None => SafetyBuffer::default(),
        };

        let defaults = Collections::default();
        let collections = Collections {
            documents: var("MONITOR_DOCUMENT_COLLECTION").unwrap_or(defaults.documents),
            records: var("MONITOR_RECORD_COLLECTION").unwrap_or(defaults.records),
        };

        Ok(Self {
            directus: DirectusConfig::new(url, auth),
            extractor_url: var("EXTRACTOR_URL"),
            extractor_api_key: var("EXTRACTOR_API_KEY"),
            safety_buffer,
            collections,
        })
    }
}

/// Read the sources file, writing a default one first if it does not exist.
pub fn load_sources(path: &Path) -> Result<Vec<SourceDefinition>> {
    if !path.exists() {
        let default = SourcesFile::default();
        let json = serde_json::to_string_pretty(&default)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write default sources file {}", path.display()))?;
        info!(path = %path.display(), "Created default sources file");
        return Ok(default.sources);
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file {}", path.display()))?;
    let file = SourcesFile::from_json(&json)
        .with_context(|| format!("Invalid sources file {}", path.display()))?;
    Ok(file.sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_token_wins_over_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("DIRECTUS_URL", "http://localhost:8055/"),
            ("DIRECTUS_TOKEN", "static"),
            ("DIRECTUS_EMAIL", "admin@example.org"),
            ("DIRECTUS_PASSWORD", "pw"),
        ]))
        .unwrap();

        assert!(matches!(config.directus.auth, Auth::Token(_)));
        assert_eq!(config.directus.base_url, "http://localhost:8055");
        assert_eq!(config.safety_buffer, SafetyBuffer::default());
        assert_eq!(config.collections.documents, "foerdermittel_scraped_data");
    }

    #[test]
    fn test_credentials_and_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DIRECTUS_URL", "http://localhost:8055"),
            ("DIRECTUS_EMAIL", "admin@example.org"),
            ("DIRECTUS_PASSWORD", "pw"),
            ("MONITOR_SAFETY_BUFFER_DAYS", "14"),
            ("MONITOR_RECORD_COLLECTION", "events"),
            ("EXTRACTOR_URL", "http://localhost:9000/extract"),
        ]))
        .unwrap();

        assert!(matches!(config.directus.auth, Auth::Credentials { .. }));
        assert_eq!(config.safety_buffer.days, 14);
        assert_eq!(config.collections.records, "events");
        assert_eq!(config.extractor_url.as_deref(), Some("http://localhost:9000/extract"));
    }

    #[test]
    fn test_missing_auth_is_an_error() {
        let result = Config::from_lookup(lookup(&[
            ("DIRECTUS_URL", "http://localhost:8055"),
            ("DIRECTUS_EMAIL", "admin@example.org"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_buffer_is_an_error() {
        let result = Config::from_lookup(lookup(&[
            ("DIRECTUS_URL", "http://localhost:8055"),
            ("DIRECTUS_TOKEN", "t"),
            ("MONITOR_SAFETY_BUFFER_DAYS", "a week"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_sources_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");

        let sources = load_sources(&path).unwrap();
        assert_eq!(sources.len(), 1);
        assert!(path.exists());

        let reloaded = load_sources(&path).unwrap();
        assert_eq!(reloaded, sources);
    }

    #[test]
    fn test_invalid_sources_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        std::fs::write(&path, r#"{ "sources": [ { "name": "", "url": "x" } ] }"#).unwrap();
        assert!(load_sources(&path).is_err());
    }
}
