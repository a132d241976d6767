//! Identity verification capability
//!
//! [`IdentityVerifier`] is the one boundary the rest of the backend calls.
//! Two variants exist, chosen at composition time by [`build_verifier`]:
//! the live [`GoogleIdentityVerifier`] and the fixed-response
//! [`FixedIdentityVerifier`] for local development.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::config::{DEFAULT_DEV_TOKEN, GoogleAuthConfig, VerifierMode};
use crate::error::{AuthError, AuthResult};
use crate::jwks::{HttpKeySetFetcher, KeySet, KeySetCache};
use crate::jwt::{self, ClaimsPolicy, CompactToken, VerifiedIdentity};

/// Verifies identity tokens presented by clients
#[async_trait]
pub trait IdentityVerifier: Send + Sync + std::fmt::Debug {
    /// Current key set
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Fetch`] when keys cannot be retrieved.
    async fn fetch_keys(&self) -> AuthResult<Arc<KeySet>>;

    /// Verify `token` and return the identity it asserts
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] kind of the first failing step.
    async fn verify(&self, token: &str) -> AuthResult<VerifiedIdentity>;

    /// Verify with an upper bound on total time
    ///
    /// Abandoning the attempt never leaves a half-written key set behind.
    ///
    /// # Errors
    ///
    /// Returns a transport [`AuthError::Fetch`] when the deadline elapses,
    /// otherwise whatever [`verify`](Self::verify) returns.
    async fn verify_with_deadline(
        &self,
        token: &str,
        deadline: Duration,
    ) -> AuthResult<VerifiedIdentity> {
        tokio::time::timeout(deadline, self.verify(token))
            .await
            .map_err(|_| AuthError::transport(format!("verification deadline of {deadline:?} elapsed")))?
    }
}

/// Live verifier for Google-issued ID tokens
///
/// # Example
///
/// ```rust,no_run
/// # use gallery_auth::{GoogleAuthConfig, GoogleIdentityVerifier, IdentityVerifier};
/// # tokio_test::block_on(async {
/// let verifier = GoogleIdentityVerifier::from_config(&GoogleAuthConfig::default())?;
///
/// let identity = verifier.verify("eyJhbGciOiJSUzI1NiIs...").await?;
/// println!("signed in: {} <{}>", identity.subject, identity.email);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct GoogleIdentityVerifier {
    cache: Arc<KeySetCache>,
    policy: ClaimsPolicy,
}

impl GoogleIdentityVerifier {
    /// Verifier over an existing cache, with no claim policy
    pub fn new(cache: Arc<KeySetCache>) -> Self {
        Self {
            cache,
            policy: ClaimsPolicy::default(),
        }
    }

    /// Verifier fetching from the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the configuration is invalid.
    pub fn from_config(config: &GoogleAuthConfig) -> AuthResult<Self> {
        config.validate()?;
        let fetcher = HttpKeySetFetcher::new(config.jwks_uri.clone(), config.request_timeout)?;
        let cache = KeySetCache::with_refresh_interval(
            Arc::new(fetcher),
            config.cache_ttl,
            config.min_refresh_interval,
        );
        Ok(Self::new(Arc::new(cache)).with_policy(config.claims.clone()))
    }

    /// Builder method: apply a claim policy after signature verification
    pub fn with_policy(mut self, policy: ClaimsPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Underlying key-set cache
    pub fn cache(&self) -> &Arc<KeySetCache> {
        &self.cache
    }

    fn verify_against(&self, token: &CompactToken, key_set: &KeySet) -> AuthResult<VerifiedIdentity> {
        let claims = jwt::verify(token, token.header(), key_set)?;
        let identity = jwt::extract(&claims)?;
        if self.policy.is_enforcing() {
            self.policy.check(&claims, SystemTime::now())?;
        }
        Ok(identity)
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn fetch_keys(&self) -> AuthResult<Arc<KeySet>> {
        self.cache.get_keys().await
    }

    #[instrument(skip_all, fields(source = self.cache.source()))]
    async fn verify(&self, token: &str) -> AuthResult<VerifiedIdentity> {
        let key_set = self.cache.get_keys().await?;
        let parsed = jwt::parse(token)?;

        match self.verify_against(&parsed, &key_set) {
            // No refresh can supply a key for a token that names none
            Err(AuthError::KeyNotFound(key_id)) if !key_id.is_empty() => {
                // Key rotation racing the cache TTL looks exactly like this; one forced refresh
                warn!(key_id = %key_id, "Unknown key id, refreshing key set and retrying once");
                let refreshed = self.cache.refresh().await?;
                let identity = self.verify_against(&parsed, &refreshed)?;
                info!(subject = %identity.subject, "Token verified after key-set refresh");
                Ok(identity)
            }
            Err(e) => {
                debug!(error = %e, "Token verification failed");
                Err(e)
            }
            Ok(identity) => {
                debug!(subject = %identity.subject, "Token verified");
                Ok(identity)
            }
        }
    }
}

/// Development verifier that accepts a single fixed token
///
/// Never talks to the network. Its key set is always empty.
#[derive(Debug, Clone)]
pub struct FixedIdentityVerifier {
    token: String,
    identity: VerifiedIdentity,
}

impl FixedIdentityVerifier {
    /// Accept `token` and answer with `identity`
    pub fn new(token: impl Into<String>, identity: VerifiedIdentity) -> Self {
        Self {
            token: token.into(),
            identity,
        }
    }

    /// The stock development identity behind `token`
    pub fn development(token: impl Into<String>) -> Self {
        Self::new(
            token,
            VerifiedIdentity {
                subject: "dev-google-sub-123".to_string(),
                email: "dev@example.com".to_string(),
                name: Some("Dev User".to_string()),
                picture: None,
            },
        )
    }
}

impl Default for FixedIdentityVerifier {
    fn default() -> Self {
        Self::development(DEFAULT_DEV_TOKEN)
    }
}

#[async_trait]
impl IdentityVerifier for FixedIdentityVerifier {
    async fn fetch_keys(&self) -> AuthResult<Arc<KeySet>> {
        debug!("Development verifier: no keys to fetch");
        Ok(Arc::new(KeySet::empty()))
    }

    async fn verify(&self, token: &str) -> AuthResult<VerifiedIdentity> {
        if token == self.token {
            debug!(subject = %self.identity.subject, "Development token accepted");
            Ok(self.identity.clone())
        } else {
            Err(AuthError::SignatureInvalid)
        }
    }
}

/// Compose the verifier selected by `config.mode`
///
/// # Errors
///
/// Returns [`AuthError::Config`] for invalid live configuration.
pub fn build_verifier(config: &GoogleAuthConfig) -> AuthResult<Arc<dyn IdentityVerifier>> {
    match &config.mode {
        VerifierMode::Live => {
            info!(jwks_uri = %config.jwks_uri, "Using live Google token verification");
            Ok(Arc::new(GoogleIdentityVerifier::from_config(config)?))
        }
        VerifierMode::Development { token } => {
            warn!("Using development token verifier; do not enable in production");
            Ok(Arc::new(FixedIdentityVerifier::development(token.clone())))
        }
    }
}
