// SPDX-License-Identifier: BUSL-1.1
//! # Identity Service Client
//!
//! `HttpSessionLookup` wraps a `reqwest::Client` with the identity service
//! base URL and API key. It is `Send + Sync` and meant to be shared behind
//! an `Arc` across request tasks.
//!
//! ## Timeout & Retry
//!
//! One attempt per request, bounded by the client timeout (default 3s).
//! The gate fails open on any error, so a retry would only add latency.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use helio_core::{RequestDescriptor, Session, SessionError, SessionLookup};

use crate::error::ClientError;
use crate::secret::SecretString;
use crate::token::extract_access_token;

/// Session cookie read when none is configured.
pub const DEFAULT_COOKIE_NAME: &str = "sb-auth-token";

/// Per-request timeout when none is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 3_000;

const USER_ENDPOINT: &str = "auth/v1/user";
const HEALTH_ENDPOINT: &str = "auth/v1/health";

/// Configuration for [`HttpSessionLookup`].
#[derive(Debug, Clone)]
pub struct SessionServiceConfig {
    /// Base URL of the identity service (e.g. `https://xyz.supabase.co`).
    pub base_url: String,
    /// Project API key, sent as the `apikey` header.
    pub api_key: SecretString,
    /// Name of the session cookie (chunks use `<name>.<n>`).
    pub cookie_name: String,
    pub timeout: Duration,
}

impl SessionServiceConfig {
    /// Create a configuration with the default cookie name and timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: SecretString::new(api_key),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Subset of the user payload the adapter reads.
#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(default)]
    id: Option<String>,
}

/// Session lookup backed by the identity service's user endpoint.
#[derive(Debug, Clone)]
pub struct HttpSessionLookup {
    client: reqwest::Client,
    base_url: Url,
    user_url: Url,
    api_key: SecretString,
    cookie_name: String,
    timeout_ms: u64,
}

impl HttpSessionLookup {
    /// Build the adapter, validating the base URL and API key up front.
    pub fn new(config: SessionServiceConfig) -> Result<Self, ClientError> {
        let base_url = parse_base_url(&config.base_url)?;
        let user_url = base_url
            .join(USER_ENDPOINT)
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: e.to_string(),
            })?;

        if reqwest::header::HeaderValue::from_str(config.api_key.expose()).is_err() {
            return Err(ClientError::InvalidApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            client,
            base_url,
            user_url,
            api_key: config.api_key,
            cookie_name: config.cookie_name,
            timeout_ms: u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Validate an access token with the identity service.
    pub async fn fetch_session(&self, token: &str) -> Result<Option<Session>, SessionError> {
        let resp = self
            .client
            .get(self.user_url.clone())
            .header("apikey", self.api_key.expose())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.transport_error("GET", &self.user_url, e))?;

        let status = resp.status();
        if status.is_success() {
            let subject = match resp.json::<UserResponse>().await {
                Ok(user) => user.id,
                Err(e) => {
                    tracing::debug!(error = %e, "user payload unreadable; session treated as present");
                    None
                }
            };
            return Ok(Some(subject.map(Session::with_subject).unwrap_or_default()));
        }

        match status.as_u16() {
            400 | 401 | 403 | 404 => {
                tracing::debug!(status = status.as_u16(), "access token rejected by identity service");
                Ok(None)
            }
            code => Err(SessionError::Upstream { status: code }),
        }
    }

    /// Probe the identity service health endpoint.
    pub async fn health_check(&self) -> Result<(), SessionError> {
        let url = self
            .base_url
            .join(HEALTH_ENDPOINT)
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        let resp = self
            .client
            .get(url.clone())
            .header("apikey", self.api_key.expose())
            .send()
            .await
            .map_err(|e| self.transport_error("GET", &url, e))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(SessionError::Upstream {
                status: resp.status().as_u16(),
            })
        }
    }

    fn transport_error(&self, method: &str, url: &Url, e: reqwest::Error) -> SessionError {
        if e.is_timeout() {
            SessionError::Timeout {
                elapsed_ms: self.timeout_ms,
            }
        } else {
            SessionError::Unavailable(format!("{method} {url}: {e}"))
        }
    }
}

#[async_trait]
impl SessionLookup for HttpSessionLookup {
    async fn current_session(
        &self,
        request: &RequestDescriptor,
    ) -> Result<Option<Session>, SessionError> {
        let Some(token) = extract_access_token(request, &self.cookie_name) else {
            tracing::trace!(path = request.path(), "no access token on request");
            return Ok(None);
        };
        self.fetch_session(&token).await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    // A trailing slash makes `join` append rather than replace the last segment.
    let url = Url::parse(&format!("{}/", raw.trim_end_matches('/')))
        .map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}
