//! Verification configuration
//!
//! The core needs two externally supplied values, the key-set endpoint and
//! the cache TTL. Everything else has a sensible default.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
pub use crate::jwt::claims::ClaimsPolicy;

/// Google's published signing keys for ID tokens
pub const GOOGLE_JWKS_URI: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Token accepted by the development verifier unless configured otherwise
pub const DEFAULT_DEV_TOKEN: &str = "dev-token";

const ENV_JWKS_URI: &str = "GALLERY_AUTH_JWKS_URI";
const ENV_CACHE_TTL_SECS: &str = "GALLERY_AUTH_CACHE_TTL_SECS";
const ENV_TIMEOUT_SECS: &str = "GALLERY_AUTH_TIMEOUT_SECS";
const ENV_MODE: &str = "GALLERY_AUTH_MODE";
const ENV_AUDIENCE: &str = "GALLERY_AUTH_AUDIENCE";
const ENV_REQUIRE_UNEXPIRED: &str = "GALLERY_AUTH_REQUIRE_UNEXPIRED";

/// Which verifier the host composes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerifierMode {
    /// Verify against the provider's published keys
    #[default]
    Live,
    /// Accept one fixed token and answer with a fixed identity (local development only)
    Development {
        /// The only token that verifies
        #[serde(default = "default_dev_token")]
        token: String,
    },
}

fn default_dev_token() -> String {
    DEFAULT_DEV_TOKEN.to_string()
}

/// Configuration for Google ID token verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleAuthConfig {
    /// Key-set endpoint
    #[serde(default = "default_jwks_uri")]
    pub jwks_uri: String,

    /// How long a fetched key set stays valid (default: 1 hour)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: Duration,

    /// Timeout for one key-set request (default: 10 seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Minimum spacing between forced refreshes (default: 5 seconds)
    #[serde(default = "default_min_refresh_interval")]
    pub min_refresh_interval: Duration,

    /// Live or development verifier
    #[serde(default)]
    pub mode: VerifierMode,

    /// Optional claim checks layered over signature verification
    #[serde(default)]
    pub claims: ClaimsPolicy,
}

fn default_jwks_uri() -> String {
    GOOGLE_JWKS_URI.to_string()
}

// Google rotates keys roughly daily, an hour is well inside that
fn default_cache_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_min_refresh_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for GoogleAuthConfig {
    fn default() -> Self {
        Self {
            jwks_uri: default_jwks_uri(),
            cache_ttl: default_cache_ttl(),
            request_timeout: default_request_timeout(),
            min_refresh_interval: default_min_refresh_interval(),
            mode: VerifierMode::default(),
            claims: ClaimsPolicy::default(),
        }
    }
}

impl GoogleAuthConfig {
    /// Development configuration accepting the default dev token
    pub fn development() -> Self {
        Self {
            mode: VerifierMode::Development {
                token: default_dev_token(),
            },
            ..Self::default()
        }
    }

    /// Load configuration from `GALLERY_AUTH_*` environment variables
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a variable is set but unparseable, or
    /// the resulting configuration fails [`validate`](Self::validate).
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(uri) = lookup(ENV_JWKS_URI) {
            config.jwks_uri = uri;
        }
        if let Some(secs) = lookup(ENV_CACHE_TTL_SECS) {
            config.cache_ttl = Duration::from_secs(parse_secs(ENV_CACHE_TTL_SECS, &secs)?);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(parse_secs(ENV_TIMEOUT_SECS, &secs)?);
        }
        if let Some(mode) = lookup(ENV_MODE) {
            config.mode = match mode.trim().to_ascii_lowercase().as_str() {
                "live" => VerifierMode::Live,
                "development" | "dev" => VerifierMode::Development {
                    token: default_dev_token(),
                },
                other => {
                    return Err(AuthError::config(format!(
                        "{ENV_MODE} must be `live` or `development`, got {other:?}"
                    )));
                }
            };
        }
        if let Some(audience) = lookup(ENV_AUDIENCE) {
            config.claims.audience = Some(audience);
        }
        if let Some(flag) = lookup(ENV_REQUIRE_UNEXPIRED) {
            config.claims.require_unexpired = match flag.trim() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(AuthError::config(format!(
                        "{ENV_REQUIRE_UNEXPIRED} must be a boolean, got {other:?}"
                    )));
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Builder method: set the key-set endpoint
    pub fn with_jwks_uri(mut self, uri: impl Into<String>) -> Self {
        self.jwks_uri = uri.into();
        self
    }

    /// Builder method: set the cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Builder method: set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builder method: set the forced-refresh rate limit
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Builder method: set the claim policy
    pub fn with_claims_policy(mut self, policy: ClaimsPolicy) -> Self {
        self.claims = policy;
        self
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when the endpoint is not an HTTPS URL
    /// (plain HTTP is allowed for localhost only), the TTL or timeout is zero,
    /// or the TTL cannot be added to the current time.
    pub fn validate(&self) -> AuthResult<()> {
        if self.mode == VerifierMode::Live {
            validate_endpoint(&self.jwks_uri)?;
        }
        if self.cache_ttl.is_zero() {
            return Err(AuthError::config("cache_ttl must be greater than zero"));
        }
        if SystemTime::now().checked_add(self.cache_ttl).is_none() {
            return Err(AuthError::config(format!(
                "cache_ttl of {}s is out of range",
                self.cache_ttl.as_secs()
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(AuthError::config("request_timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Require HTTPS for a key-set endpoint, except on loopback hosts
///
/// # Errors
///
/// Returns [`AuthError::Config`] for unparseable or non-HTTPS URLs.
pub fn validate_endpoint(uri: &str) -> AuthResult<()> {
    let url = url::Url::parse(uri)
        .map_err(|e| AuthError::config(format!("invalid key-set endpoint {uri:?}: {e}")))?;

    match url.scheme() {
        "https" => Ok(()),
        "http" if matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")) => Ok(()),
        _ => Err(AuthError::config(
            "key-set endpoint must use HTTPS (HTTP only allowed for localhost)",
        )),
    }
}

fn parse_secs(name: &str, value: &str) -> AuthResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| AuthError::config(format!("{name} must be a number of seconds, got {value:?}")))
}
