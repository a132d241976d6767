//! Tower Layer for bearer-token authentication

use std::sync::Arc;

use tower::Layer;

use crate::verifier::IdentityVerifier;

use super::BearerAuthConfig;
use super::service::BearerAuthService;

/// Tower Layer that wraps services with [`BearerAuthService`]
///
/// The verifier is shared; cloning the layer or the services it produces
/// never duplicates the key-set cache.
#[derive(Debug, Clone)]
pub struct BearerAuthLayer {
    verifier: Arc<dyn IdentityVerifier>,
    config: BearerAuthConfig,
}

impl BearerAuthLayer {
    /// Layer with default configuration
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self::with_config(verifier, BearerAuthConfig::default())
    }

    /// Layer with custom configuration
    pub fn with_config(verifier: Arc<dyn IdentityVerifier>, config: BearerAuthConfig) -> Self {
        Self { verifier, config }
    }

    /// Skip authentication for `path`
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.config.bypass_paths.push(path.into());
        self
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService::new(inner, Arc::clone(&self.verifier), self.config.clone())
    }
}
