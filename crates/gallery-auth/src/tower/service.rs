//! Tower Service for bearer-token authentication

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::{Request, Response, StatusCode};
use tower_service::Service;
use tracing::{debug, warn};

use crate::error::{AuthError, ErrorKind};
use crate::verifier::IdentityVerifier;

use super::BearerAuthConfig;

/// Why a request was turned away before reaching the inner service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No credential header
    MissingHeader,
    /// Header present but not `Bearer <token>`
    MalformedHeader,
    /// The verifier refused the token
    Verification(AuthError),
}

impl Rejection {
    /// Status the response carries
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Verification(e) if matches!(e.kind(), ErrorKind::Fetch(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Render as a JSON error response
    pub fn into_response<ResBody>(self) -> Response<ResBody>
    where
        ResBody: From<String>,
    {
        let body = serde_json::json!({ "error": self.to_string() }).to_string();
        let mut response = Response::new(ResBody::from(body));
        *response.status_mut() = self.status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader => f.write_str("missing Authorization header"),
            Self::MalformedHeader => f.write_str("invalid Authorization header format"),
            Self::Verification(e) if matches!(e.kind(), ErrorKind::Fetch(_)) => {
                f.write_str("failed to fetch signing keys")
            }
            Self::Verification(e) => write!(f, "invalid token: {e}"),
        }
    }
}

/// Token from a `Bearer <token>` header value
///
/// The value must be exactly two space-separated parts with the scheme
/// spelled `Bearer`.
///
/// # Errors
///
/// [`Rejection::MissingHeader`] when the header is absent or empty,
/// [`Rejection::MalformedHeader`] otherwise.
pub fn extract_bearer<'a>(headers: &'a HeaderMap, header_name: &str) -> Result<&'a str, Rejection> {
    let value = headers
        .get(header_name)
        .filter(|value| !value.is_empty())
        .ok_or(Rejection::MissingHeader)?;
    let value = value.to_str().map_err(|_| Rejection::MalformedHeader)?;

    match value.split(' ').collect::<Vec<_>>().as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(token),
        _ => Err(Rejection::MalformedHeader),
    }
}

/// Tower Service that authenticates requests before forwarding them
///
/// On success the [`VerifiedIdentity`](crate::VerifiedIdentity) is inserted
/// into the request extensions. Rejections never reach the inner service.
#[derive(Debug, Clone)]
pub struct BearerAuthService<S> {
    inner: S,
    verifier: Arc<dyn IdentityVerifier>,
    config: BearerAuthConfig,
}

impl<S> BearerAuthService<S> {
    /// Wrap `inner`
    pub fn new(inner: S, verifier: Arc<dyn IdentityVerifier>, config: BearerAuthConfig) -> Self {
        Self {
            inner,
            verifier,
            config,
        }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Future returned by [`BearerAuthService`]
pub type BearerAuthFuture<T, E> = BoxFuture<'static, Result<T, E>>;

impl<S, B, ResBody> Service<Request<B>> for BearerAuthService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    B: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BearerAuthFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.config.should_bypass(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let token = match extract_bearer(req.headers(), &self.config.auth_header) {
            Ok(token) => token.to_string(),
            Err(rejection) => {
                debug!(path = req.uri().path(), %rejection, "Rejected request without bearer token");
                return Box::pin(async move { Ok(rejection.into_response()) });
            }
        };

        let verifier = Arc::clone(&self.verifier);
        Box::pin(async move {
            match verifier.verify(&token).await {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                    inner.call(req).await
                }
                Err(e) => {
                    let rejection = Rejection::Verification(e);
                    if rejection.status() == StatusCode::SERVICE_UNAVAILABLE {
                        warn!(%rejection, "Key set unavailable, refusing request");
                    } else {
                        debug!(%rejection, "Token rejected");
                    }
                    Ok(rejection.into_response())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VerifiedIdentity;
    use crate::jwks::KeySet;
    use crate::verifier::FixedIdentityVerifier;
    use crate::{AuthResult, tower::BearerAuthLayer};
    use async_trait::async_trait;
    use std::convert::Infallible;
    use tower::{Layer, ServiceExt};

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait]
    impl IdentityVerifier for Unreachable {
        async fn fetch_keys(&self) -> AuthResult<Arc<KeySet>> {
            Err(AuthError::transport("connection refused"))
        }

        async fn verify(&self, _token: &str) -> AuthResult<VerifiedIdentity> {
            Err(AuthError::transport("connection refused"))
        }
    }

    async fn echo_subject(req: Request<()>) -> Result<Response<String>, Infallible> {
        let subject = req
            .extensions()
            .get::<VerifiedIdentity>()
            .map_or_else(|| "anonymous".to_string(), |id| id.subject.clone());
        Ok(Response::new(subject))
    }

    fn request(authorization: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/api/photos");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap()
    }

    fn dev_layer() -> BearerAuthLayer {
        BearerAuthLayer::new(Arc::new(FixedIdentityVerifier::default()))
    }

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers, "authorization"), Err(Rejection::MissingHeader));

        for (value, expected) in [
            ("Bearer abc", Ok("abc")),
            ("bearer abc", Err(Rejection::MalformedHeader)),
            ("Basic abc", Err(Rejection::MalformedHeader)),
            ("Bearer", Err(Rejection::MalformedHeader)),
            ("Bearer ", Err(Rejection::MalformedHeader)),
            ("Bearer a b", Err(Rejection::MalformedHeader)),
        ] {
            headers.insert("authorization", HeaderValue::from_static(value));
            assert_eq!(extract_bearer(&headers, "authorization"), expected, "{value:?}");
        }
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let service = dev_layer().layer(tower::service_fn(echo_subject));
        let response = service.oneshot(request(Some("Bearer dev-token"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "dev-google-sub-123");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let service = dev_layer().layer(tower::service_fn(echo_subject));
        let response = service.oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["error"], "missing Authorization header");
    }

    #[tokio::test]
    async fn test_malformed_header_is_unauthorized() {
        let service = dev_layer().layer(tower::service_fn(echo_subject));
        let response = service.oneshot(request(Some("Token dev-token"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let service = dev_layer().layer(tower::service_fn(echo_subject));
        let response = service.oneshot(request(Some("Bearer wrong"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["error"], "invalid token: signature verification failed");
    }

    #[tokio::test]
    async fn test_key_set_outage_is_service_unavailable() {
        let service = BearerAuthLayer::new(Arc::new(Unreachable)).layer(tower::service_fn(echo_subject));
        let response = service.oneshot(request(Some("Bearer anything"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["error"], "failed to fetch signing keys");
    }

    #[tokio::test]
    async fn test_bypass_path_skips_verification() {
        let service = BearerAuthLayer::new(Arc::new(Unreachable))
            .bypass_path("/health")
            .layer(tower::service_fn(echo_subject));
        let req = Request::builder().uri("/health").body(()).unwrap();
        let response = service.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "anonymous");
    }
}
