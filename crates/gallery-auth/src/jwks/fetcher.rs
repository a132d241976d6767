//! Key-set fetching over HTTPS

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use super::types::{KeySetDocument, KeySetEntry};
use crate::config::validate_endpoint;
use crate::error::{AuthError, AuthResult};

/// Largest key-set response accepted (Google's is well under 4 KiB)
pub const MAX_RESPONSE_SIZE: usize = 64 * 1024;

/// Source of published keys
///
/// The cache owns one fetcher and calls it at most once per refresh. Tests
/// substitute counting or scripted fetchers.
#[async_trait]
pub trait KeySetFetcher: Send + Sync + std::fmt::Debug {
    /// Retrieve the current key list
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Fetch`] with [`Transport`](crate::FetchErrorKind::Transport)
    /// for connection, timeout and status failures, and
    /// [`Decode`](crate::FetchErrorKind::Decode) for bodies that are not a key set.
    async fn fetch(&self) -> AuthResult<Vec<KeySetEntry>>;

    /// Where keys come from, for logging
    fn source(&self) -> &str;
}

/// Fetches a JWKS document with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    jwks_uri: String,
    http_client: reqwest::Client,
}

impl HttpKeySetFetcher {
    /// Create a fetcher for `jwks_uri`
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the endpoint is not HTTPS (plain
    /// HTTP is allowed for localhost) or the HTTP client cannot be built.
    pub fn new(jwks_uri: impl Into<String>, request_timeout: Duration) -> AuthResult<Self> {
        let jwks_uri = jwks_uri.into();
        validate_endpoint(&jwks_uri)?;

        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("gallery-auth/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            jwks_uri,
            http_client,
        })
    }

    /// The endpoint this fetcher reads
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self) -> AuthResult<Vec<KeySetEntry>> {
        debug!(jwks_uri = %self.jwks_uri, "Fetching key set");

        let response = self
            .http_client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| {
                error!(jwks_uri = %self.jwks_uri, error = %e, "Failed to fetch key set");
                AuthError::transport(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(jwks_uri = %self.jwks_uri, status = %status, "Key-set endpoint returned error status");
            return Err(AuthError::transport(format!("endpoint returned status {status}")));
        }

        if let Some(length) = response.content_length()
            && length > MAX_RESPONSE_SIZE as u64
        {
            return Err(AuthError::decode(format!(
                "response of {length} bytes exceeds {MAX_RESPONSE_SIZE}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            error!(jwks_uri = %self.jwks_uri, error = %e, "Failed to read key-set body");
            AuthError::transport(format!("failed to read body: {e}"))
        })?;

        if body.len() > MAX_RESPONSE_SIZE {
            return Err(AuthError::decode(format!(
                "response of {} bytes exceeds {MAX_RESPONSE_SIZE}",
                body.len()
            )));
        }

        let document: KeySetDocument = serde_json::from_slice(&body).map_err(|e| {
            error!(jwks_uri = %self.jwks_uri, error = %e, "Failed to parse key-set JSON");
            AuthError::decode(format!("invalid key-set document: {e}"))
        })?;

        info!(
            jwks_uri = %self.jwks_uri,
            key_count = document.keys.len(),
            "Fetched key set"
        );

        Ok(document.keys)
    }

    fn source(&self) -> &str {
        &self.jwks_uri
    }
}
