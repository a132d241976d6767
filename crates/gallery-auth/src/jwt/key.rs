//! RSA public key reconstruction from published JWK components

use rsa::{BigUint, RsaPublicKey};

use super::base64url;
use crate::error::{AuthError, AuthResult};

/// Build an RSA public key from base64url modulus and exponent
///
/// The modulus is an arbitrary-length big-endian unsigned integer. The
/// exponent is accumulated most-significant byte first, so `AQAB` and a
/// zero-prefixed `AAEAAQ` both give 65537.
///
/// # Errors
///
/// Returns [`AuthError::Key`] when either component is not base64url, the
/// modulus is zero, the exponent does not fit in 64 bits, or the `rsa`
/// crate rejects the pair (exponent below 2, modulus over 4096 bits).
pub fn reconstruct(modulus: &str, exponent: &str) -> AuthResult<RsaPublicKey> {
    let modulus_bytes = base64url::decode(modulus)
        .map_err(|e| AuthError::key(format!("modulus is not base64url: {e}")))?;
    let exponent_bytes = base64url::decode(exponent)
        .map_err(|e| AuthError::key(format!("exponent is not base64url: {e}")))?;

    if modulus_bytes.iter().all(|&b| b == 0) {
        return Err(AuthError::key("modulus is zero"));
    }
    let exponent = exponent_from_bytes(&exponent_bytes)?;

    RsaPublicKey::new(
        BigUint::from_bytes_be(&modulus_bytes),
        BigUint::from(exponent),
    )
    .map_err(|e| AuthError::key(format!("invalid RSA public key: {e}")))
}

fn exponent_from_bytes(bytes: &[u8]) -> AuthResult<u64> {
    let mut exponent: u64 = 0;
    for &byte in bytes {
        if exponent > u64::MAX >> 8 {
            return Err(AuthError::key("exponent does not fit in 64 bits"));
        }
        exponent = (exponent << 8) | u64::from(byte);
    }
    Ok(exponent)
}
