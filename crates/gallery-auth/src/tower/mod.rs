//! # Tower middleware for bearer-token authentication
//!
//! [`BearerAuthLayer`] wraps an HTTP service with [`BearerAuthService`], which
//! reads `Authorization: Bearer <token>`, runs an [`IdentityVerifier`] and
//! forwards the request with the [`VerifiedIdentity`] in its extensions.
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use gallery_auth::{build_verifier, GoogleAuthConfig};
//! use gallery_auth::tower::BearerAuthLayer;
//!
//! let verifier = build_verifier(&GoogleAuthConfig::from_env()?)?;
//! let service = ServiceBuilder::new()
//!     .layer(BearerAuthLayer::new(verifier))
//!     .service(my_handler);
//!
//! // In the handler
//! let identity = req.extensions().get::<VerifiedIdentity>();
//! ```
//!
//! Rejections are answered directly with a JSON body `{"error": "..."}`:
//!
//! | Failure | Status |
//! |---------|--------|
//! | header missing or not `Bearer <token>` | 401 |
//! | key set unavailable | 503 |
//! | any other verification failure | 401 |
//!
//! [`IdentityVerifier`]: crate::IdentityVerifier
//! [`VerifiedIdentity`]: crate::VerifiedIdentity

mod layer;
mod service;

pub use layer::BearerAuthLayer;
pub use service::{BearerAuthService, BearerAuthFuture, Rejection, extract_bearer};

/// Configuration for the bearer layer
#[derive(Debug, Clone)]
pub struct BearerAuthConfig {
    /// Header carrying the credential (default: `Authorization`)
    pub auth_header: String,
    /// Request paths passed through without authentication (e.g. `/health`)
    pub bypass_paths: Vec<String>,
}

impl Default for BearerAuthConfig {
    fn default() -> Self {
        Self {
            auth_header: http::header::AUTHORIZATION.as_str().to_string(),
            bypass_paths: Vec::new(),
        }
    }
}

impl BearerAuthConfig {
    /// Add a path to the bypass list
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.bypass_paths.push(path.into());
        self
    }

    /// Set the header name
    #[must_use]
    pub fn auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    /// Whether `path` skips authentication
    #[must_use]
    pub fn should_bypass(&self, path: &str) -> bool {
        self.bypass_paths.iter().any(|p| p == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BearerAuthConfig::default();
        assert_eq!(config.auth_header, "authorization");
        assert!(config.bypass_paths.is_empty());
    }

    #[test]
    fn test_bypass_paths() {
        let config = BearerAuthConfig::default()
            .bypass_path("/health")
            .bypass_path("/ready");
        assert!(config.should_bypass("/health"));
        assert!(config.should_bypass("/ready"));
        assert!(!config.should_bypass("/api/photos"));
    }
}
