//! Common test utilities for integration tests
//!
//! A wiremock key-set endpoint plus RSA issuers that mint tokens with
//! `jsonwebtoken`, the way a real identity provider would.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use gallery_auth::{GoogleAuthConfig, GoogleIdentityVerifier};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const CERTS_PATH: &str = "/oauth2/v3/certs";

/// An RSA signing key with its published key id
pub struct TestIssuer {
    pub kid: String,
    private: RsaPrivateKey,
    encoding: EncodingKey,
}

impl TestIssuer {
    pub fn generate(kid: &str) -> Self {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate RSA key");
        let pem = private.to_pkcs1_pem(LineEnding::LF).expect("encode PEM");
        let encoding = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("load PEM");
        Self {
            kid: kid.to_string(),
            private,
            encoding,
        }
    }

    /// Key-set entry as Google publishes it
    pub fn jwk(&self) -> Value {
        let public = self.private.to_public_key();
        json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": self.kid,
            "n": URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
        })
    }

    /// RS256 token carrying this issuer's kid
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        self.sign_with_header(&header, claims)
    }

    pub fn sign_with_header(&self, header: &Header, claims: &Value) -> String {
        jsonwebtoken::encode(header, claims, &self.encoding).expect("sign token")
    }
}

/// Primary issuer, `kid = "k1"`
pub fn issuer() -> &'static TestIssuer {
    static ISSUER: OnceLock<TestIssuer> = OnceLock::new();
    ISSUER.get_or_init(|| TestIssuer::generate("k1"))
}

/// Second issuer for rotation scenarios, `kid = "k2"`
pub fn rotated_issuer() -> &'static TestIssuer {
    static ISSUER: OnceLock<TestIssuer> = OnceLock::new();
    ISSUER.get_or_init(|| TestIssuer::generate("k2"))
}

/// Google-shaped claims for subject 112233
pub fn google_claims() -> Value {
    json!({
        "iss": "https://accounts.google.com",
        "aud": "gallery-client-id",
        "sub": "112233",
        "email": "a@b.com",
        "email_verified": true,
        "name": "Ada Lovelace",
        "picture": "https://lh3.googleusercontent.com/a/photo.jpg",
        "iat": 1_700_000_000u64,
        "exp": 1_700_003_600u64,
    })
}

/// Mock key-set endpoint
pub struct MockKeyServer {
    pub server: MockServer,
    pub jwks_uri: String,
}

impl MockKeyServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let jwks_uri = format!("{}{CERTS_PATH}", server.uri());
        Self { server, jwks_uri }
    }

    /// Serve `keys` for every request
    pub async fn mock_keys(&self, keys: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(CERTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.server)
            .await;
    }

    /// Serve `keys` for the next request only; later mounts answer after that
    pub async fn mock_keys_once(&self, keys: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(CERTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Serve `keys` after a delay
    pub async fn mock_keys_delayed(&self, keys: Vec<Value>, delay: Duration) {
        Mock::given(method("GET"))
            .and(path(CERTS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "keys": keys }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mock_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(CERTS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_body(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path(CERTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Number of key-set requests received so far
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    /// Live configuration pointed at this server, forced refreshes unthrottled
    pub fn config(&self) -> GoogleAuthConfig {
        GoogleAuthConfig::default()
            .with_jwks_uri(self.jwks_uri.clone())
            .with_request_timeout(Duration::from_secs(2))
            .with_min_refresh_interval(Duration::ZERO)
    }

    pub fn verifier(&self) -> Arc<GoogleIdentityVerifier> {
        Arc::new(GoogleIdentityVerifier::from_config(&self.config()).expect("valid config"))
    }
}
