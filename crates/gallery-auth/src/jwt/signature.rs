//! RS256 signature verification
//!
//! Certifies only that the signing input was signed by a key the provider
//! currently publishes. Expiry, issuer and audience are left to
//! [`ClaimsPolicy`](super::claims::ClaimsPolicy).

use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::claims::Claims;
use super::key;
use super::token::{CompactToken, Header};
use crate::error::{AuthError, AuthResult};
use crate::jwks::KeySet;

/// The one accepted algorithm: RSASSA-PKCS1-v1_5 with SHA-256
pub const SUPPORTED_ALGORITHM: &str = "RS256";

/// Verify a parsed token against a key set and decode its claims
///
/// Steps, each short-circuiting:
/// 1. `header.algorithm` must be [`SUPPORTED_ALGORITHM`]
/// 2. the first key whose `kid` equals `header.key_id` is selected
/// 3. that key's modulus and exponent are turned into an RSA public key
/// 4. the PKCS#1 v1.5 signature over SHA-256 of the signing input is checked
/// 5. the payload is decoded
///
/// # Errors
///
/// - [`AuthError::AlgorithmRejected`] for any other algorithm; no key is consulted
/// - [`AuthError::KeyNotFound`] when no key carries the kid (or the header has none)
/// - [`AuthError::Key`] when the matched key material is malformed
/// - [`AuthError::SignatureInvalid`] when the signature does not match
/// - [`AuthError::Format`] when the payload is not a JSON object, even though
///   the signature was valid
pub fn verify(token: &CompactToken, header: &Header, key_set: &KeySet) -> AuthResult<Claims> {
    if header.algorithm != SUPPORTED_ALGORITHM {
        warn!(algorithm = %header.algorithm, "Rejected token algorithm");
        return Err(AuthError::AlgorithmRejected(header.algorithm.clone()));
    }

    let key_id = header
        .key_id
        .as_deref()
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| AuthError::KeyNotFound(String::new()))?;

    let entry = key_set.find(key_id).ok_or_else(|| {
        debug!(key_id, key_count = key_set.len(), "Key id not found in key set");
        AuthError::KeyNotFound(key_id.to_string())
    })?;

    let public_key = key::reconstruct(&entry.modulus, &entry.exponent)?;

    let digest = Sha256::digest(token.signing_input());
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, token.signature())
        .map_err(|_| {
            debug!(key_id, "Signature mismatch");
            AuthError::SignatureInvalid
        })?;

    Claims::decode(token.payload_segment())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::token::parse;
    use crate::testutil::{TEST_KID, sign_raw, sign_token, test_key, test_key_set};
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn verify_text(text: &str, key_set: &KeySet) -> AuthResult<Claims> {
        let token = parse(text)?;
        verify(&token, token.header(), key_set)
    }

    #[test]
    fn test_valid_token() {
        let text = sign_token(
            &json!({"kid": TEST_KID, "alg": "RS256"}),
            &json!({"sub": "112233", "email": "a@b.com"}),
        );
        let claims = verify_text(&text, &test_key_set()).unwrap();
        assert_eq!(claims.get_str("sub"), Some("112233"));
        assert_eq!(claims.get_str("email"), Some("a@b.com"));
    }

    #[test]
    fn test_altered_payload_fails() {
        let text = sign_token(
            &json!({"kid": TEST_KID, "alg": "RS256"}),
            &json!({"sub": "112233", "email": "a@b.com"}),
        );
        let mut parts: Vec<String> = text.split('.').map(str::to_string).collect();
        parts[1] = URL_SAFE_NO_PAD.encode(r#"{"sub":"112234","email":"a@b.com"}"#);
        let tampered = parts.join(".");

        assert_eq!(
            verify_text(&tampered, &test_key_set()),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_altered_header_fails() {
        let text = sign_token(
            &json!({"kid": TEST_KID, "alg": "RS256"}),
            &json!({"sub": "112233", "email": "a@b.com"}),
        );
        let parts: Vec<&str> = text.split('.').collect();

        // Same kid and alg, so lookup still succeeds; only the signed bytes differ
        for header in [
            format!(r#"{{"kid":"{TEST_KID}","alg":"RS256","typ":"JWT"}}"#),
            format!(r#"{{"alg":"RS256","kid":"{TEST_KID}"}}"#),
        ] {
            let tampered = format!("{}.{}.{}", URL_SAFE_NO_PAD.encode(&header), parts[1], parts[2]);
            assert_eq!(
                verify_text(&tampered, &test_key_set()),
                Err(AuthError::SignatureInvalid),
                "header {header}"
            );
        }
    }

    #[test]
    fn test_flipped_signature_bit_fails() {
        let text = sign_token(
            &json!({"kid": TEST_KID, "alg": "RS256"}),
            &json!({"sub": "1", "email": "a@b.com"}),
        );
        let mut token = parse(&text).unwrap();
        let mut signature = token.signature().to_vec();
        signature[10] ^= 0x01;
        let tampered = format!(
            "{}.{}.{}",
            token.header_segment(),
            token.payload_segment(),
            URL_SAFE_NO_PAD.encode(&signature)
        );
        token = parse(&tampered).unwrap();

        assert_eq!(
            verify(&token, token.header(), &test_key_set()),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_other_algorithms_short_circuit() {
        // Every token below carries a valid RS256 signature by a published key
        let keys = test_key_set();
        for alg in ["HS256", "none", "RS512", "PS256", "ES256", "rs256", ""] {
            let text = sign_token(
                &json!({"kid": TEST_KID, "alg": alg}),
                &json!({"sub": "1", "email": "a@b.com"}),
            );
            assert_eq!(
                verify_text(&text, &keys),
                Err(AuthError::AlgorithmRejected(alg.to_string())),
                "alg {alg:?}"
            );
        }
    }

    #[test]
    fn test_unknown_kid() {
        let text = sign_token(
            &json!({"kid": "rotated-away", "alg": "RS256"}),
            &json!({"sub": "1", "email": "a@b.com"}),
        );
        assert_eq!(
            verify_text(&text, &test_key_set()),
            Err(AuthError::KeyNotFound("rotated-away".to_string()))
        );
    }

    #[test]
    fn test_missing_kid() {
        let text = sign_token(&json!({"alg": "RS256"}), &json!({"sub": "1", "email": "x"}));
        assert!(matches!(
            verify_text(&text, &test_key_set()),
            Err(AuthError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_key_material() {
        let mut entries = test_key_set().entries().to_vec();
        entries[0].modulus = "!!not base64!!".to_string();
        let broken = KeySet::new(entries, std::time::Duration::from_secs(60));

        let text = sign_token(
            &json!({"kid": TEST_KID, "alg": "RS256"}),
            &json!({"sub": "1", "email": "a@b.com"}),
        );
        assert!(matches!(verify_text(&text, &broken), Err(AuthError::Key(_))));
    }

    #[test]
    fn test_signed_garbage_payload_is_format_error() {
        let header = URL_SAFE_NO_PAD.encode(format!(r#"{{"kid":"{TEST_KID}","alg":"RS256"}}"#));
        let payload = URL_SAFE_NO_PAD.encode("this is not json");
        let text = sign_raw(&header, &payload, &test_key().private);

        assert!(matches!(
            verify_text(&text, &test_key_set()),
            Err(AuthError::Format(_))
        ));
    }
}
