//! Pure Directus REST API client.
//!
//! A minimal client for the generic `/items/{collection}` API of a Directus
//! instance. Record shapes are left to the caller; this crate only moves
//! JSON, handles bearer authentication and applies one retry policy.
//!
//! # Example
//!
//! ```rust,ignore
//! use directus_client::{Auth, DirectusClient, DirectusConfig, Query};
//!
//! let config = DirectusConfig::new("https://cms.example.org", Auth::token(token));
//! let client = DirectusClient::connect(config).await?;
//!
//! let active: Vec<serde_json::Value> = client
//!     .find_items("scraped_pages", &Query::new().eq("is_active", true).limit(-1))
//!     .await?;
//! ```

pub mod error;
pub mod retry;
pub mod types;

pub use error::{DirectusError, Result};
pub use retry::RetryPolicy;
pub use types::{ApiResponse, Auth, DirectusConfig, Query};

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use types::{LoginData, LoginRequest};

/// Directus API client.
pub struct DirectusClient {
    http: reqwest::Client,
    config: DirectusConfig,
    token: RwLock<Option<String>>,
}

impl DirectusClient {
    /// Create a client without contacting the server.
    ///
    /// With [`Auth::Credentials`] no token is held until [`login`](Self::login)
    /// runs; prefer [`connect`](Self::connect).
    pub fn new(config: DirectusConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let token = match &config.auth {
            Auth::Token(token) => Some(token.expose_secret().to_string()),
            Auth::Credentials { .. } => None,
        };

        Ok(Self {
            http,
            config,
            token: RwLock::new(token),
        })
    }

    /// Create a client and authenticate if credentials were given.
    pub async fn connect(config: DirectusConfig) -> Result<Self> {
        let client = Self::new(config)?;
        match client.config.auth {
            Auth::Credentials { .. } => client.login().await?,
            Auth::Token(_) => info!("Using static API token for Directus authentication"),
        }
        Ok(client)
    }

    /// Base URL of the Directus instance.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Exchange credentials for a fresh access token.
    ///
    /// A no-op for static tokens.
    pub async fn login(&self) -> Result<()> {
        let (email, password) = match &self.config.auth {
            Auth::Token(_) => return Ok(()),
            Auth::Credentials { email, password } => (email.as_str(), password.expose_secret()),
        };

        let url = format!("{}/auth/login", self.config.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DirectusError::Auth(format!("HTTP {}: {}", status, body)));
        }

        let login: ApiResponse<LoginData> = resp
            .json()
            .await
            .map_err(|e| DirectusError::Parse(e.to_string()))?;

        let token = login
            .data
            .access_token
            .ok_or_else(|| DirectusError::Auth("no access token in login response".into()))?;

        *self.token.write().await = Some(token);
        info!("Successfully authenticated with Directus");
        Ok(())
    }

    /// Check that the server is reachable.
    pub async fn ping(&self) -> Result<()> {
        let resp = self
            .execute(Method::GET, "/server/ping", &[], None::<&()>)
            .await?;
        Self::ensure_success(resp).await.map(|_| ())
    }

    /// Create an item and return the stored representation.
    pub async fn create_item<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        item: &T,
    ) -> Result<serde_json::Value> {
        let path = format!("/items/{}", collection);
        let resp = self.execute(Method::POST, &path, &[], Some(item)).await?;
        Self::parse_data(resp).await
    }

    /// Fetch a single item by id. Returns `None` when it does not exist.
    pub async fn get_item(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>> {
        let path = format!("/items/{}/{}", collection, id);
        let resp = self.execute(Method::GET, &path, &[], None::<&()>).await?;

        // Directus answers 403 for ids the token cannot see, including missing ones.
        if matches!(resp.status(), StatusCode::NOT_FOUND | StatusCode::FORBIDDEN) {
            debug!(collection, id, status = %resp.status(), "Item not found");
            return Ok(None);
        }

        Self::parse_data(resp).await.map(Some)
    }

    /// Query items of a collection.
    pub async fn find_items<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<T>> {
        let path = format!("/items/{}", collection);
        let params = query.to_params();
        let resp = self
            .execute(Method::GET, &path, &params, None::<&()>)
            .await?;
        let items: Vec<serde_json::Value> = serde_json::from_value(Self::parse_data(resp).await?)
            .map_err(|e| DirectusError::Parse(e.to_string()))?;

        items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(|e| DirectusError::Parse(e.to_string())))
            .collect()
    }

    /// Apply a partial update to an item.
    pub async fn update_item<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        patch: &T,
    ) -> Result<serde_json::Value> {
        let path = format!("/items/{}/{}", collection, id);
        let resp = self.execute(Method::PATCH, &path, &[], Some(patch)).await?;
        Self::parse_data(resp).await
    }

    /// Send a request with bearer auth, one re-login on 401 and the retry policy.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let policy = &self.config.retry;
        let mut reauthenticated = false;
        let mut attempt = 0u32;
        let mut last_error = String::new();

        loop {
            attempt += 1;
            if attempt > policy.max_attempts {
                return Err(DirectusError::RetriesExhausted {
                    attempts: policy.max_attempts,
                    last_error,
                });
            }

            let delay = policy.backoff_for(attempt);
            if !delay.is_zero() {
                debug!(
                    url = %url,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying Directus request"
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.http.request(method.clone(), &url).query(params);
            if let Some(token) = self.token.read().await.as_deref() {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(resp) if resp.status() == StatusCode::UNAUTHORIZED => {
                    let can_login = matches!(self.config.auth, Auth::Credentials { .. });
                    if can_login && !reauthenticated {
                        warn!(url = %url, "Directus token rejected, re-authenticating");
                        reauthenticated = true;
                        self.login().await?;
                        attempt -= 1;
                        continue;
                    }
                    let body = resp.text().await.unwrap_or_default();
                    return Err(DirectusError::Unauthorized(body));
                }
                Ok(resp) if RetryPolicy::should_retry_status(&method, resp.status()) => {
                    warn!(url = %url, status = %resp.status(), attempt, "Transient Directus error");
                    last_error = format!("HTTP {}", resp.status());
                }
                Ok(resp) => return Ok(resp),
                Err(e) if RetryPolicy::should_retry_error(&method, &e) => {
                    warn!(url = %url, error = %e, attempt, "Directus request failed");
                    last_error = e.to_string();
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(DirectusError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn parse_data(resp: reqwest::Response) -> Result<serde_json::Value> {
        let resp = Self::ensure_success(resp).await?;
        let api_resp: ApiResponse<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| DirectusError::Parse(e.to_string()))?;
        Ok(api_resp.data)
    }
}
