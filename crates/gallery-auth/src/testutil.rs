//! Shared fixtures for unit tests: one RSA key pair per test binary

use std::sync::OnceLock;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::jwks::{KeySet, KeySetEntry};

pub(crate) const TEST_KID: &str = "k1";

pub(crate) struct TestKey {
    pub(crate) private: RsaPrivateKey,
    pub(crate) public: RsaPublicKey,
}

/// 2048-bit key, generated once
pub(crate) fn test_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate RSA key");
        let public = private.to_public_key();
        TestKey { private, public }
    })
}

pub(crate) fn test_entry() -> KeySetEntry {
    let public = &test_key().public;
    KeySetEntry {
        key_id: TEST_KID.to_string(),
        modulus: URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
        exponent: URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
        algorithm: "RS256".to_string(),
    }
}

pub(crate) fn test_key_set() -> KeySet {
    KeySet::new(vec![test_entry()], Duration::from_secs(3600))
}

/// Sign already-encoded header and payload segments
pub(crate) fn sign_raw(header_segment: &str, payload_segment: &str, key: &RsaPrivateKey) -> String {
    let signing_input = format!("{header_segment}.{payload_segment}");
    let digest = Sha256::digest(signing_input.as_bytes());
    let signature = key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .expect("sign");
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
}

/// Sign JSON header and payload with the shared test key
pub(crate) fn sign_token(header: &serde_json::Value, payload: &serde_json::Value) -> String {
    sign_raw(
        &URL_SAFE_NO_PAD.encode(header.to_string()),
        &URL_SAFE_NO_PAD.encode(payload.to_string()),
        &test_key().private,
    )
}
