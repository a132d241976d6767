//! Compact token parsing
//!
//! A compact token is `header.payload.signature`, each segment base64url
//! without padding. Parsing decodes the header and signature; the payload
//! stays encoded until the signature over it has been checked.

use serde::Deserialize;

use super::base64url;
use crate::error::{AuthError, AuthResult};

/// Decoded token header
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Header {
    /// Key id (`kid`) naming the signing key
    #[serde(rename = "kid", default)]
    pub key_id: Option<String>,
    /// Declared algorithm (`alg`)
    #[serde(rename = "alg", default)]
    pub algorithm: String,
}

/// A token split into its parts
///
/// `signing_input` is the original text of the first two segments joined by
/// `.`. It is never rebuilt from decoded JSON: re-serialization can change
/// byte layout and would break the signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactToken {
    header: Header,
    header_segment: String,
    payload_segment: String,
    signature: Vec<u8>,
    signing_input: String,
}

impl CompactToken {
    /// Decoded header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// First segment as received
    pub fn header_segment(&self) -> &str {
        &self.header_segment
    }

    /// Second segment as received, still encoded
    pub fn payload_segment(&self) -> &str {
        &self.payload_segment
    }

    /// Decoded signature bytes
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Bytes the signature was computed over
    pub fn signing_input(&self) -> &[u8] {
        self.signing_input.as_bytes()
    }
}

/// Split and decode a compact token
///
/// # Errors
///
/// Returns [`AuthError::Format`] when the text does not have exactly three
/// dot-separated segments, or the header or signature segment is not valid
/// base64url, or the header is not a JSON object.
pub fn parse(token: &str) -> AuthResult<CompactToken> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header_segment, payload_segment, signature_segment] = segments.as_slice() else {
        return Err(AuthError::format(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    let header_json = base64url::decode(header_segment)
        .map_err(|e| AuthError::format(format!("header is not base64url: {e}")))?;
    let header: Header = serde_json::from_slice(&header_json)
        .map_err(|e| AuthError::format(format!("header is not valid JSON: {e}")))?;

    let signature = base64url::decode(signature_segment)
        .map_err(|e| AuthError::format(format!("signature is not base64url: {e}")))?;

    Ok(CompactToken {
        header,
        header_segment: (*header_segment).to_string(),
        payload_segment: (*payload_segment).to_string(),
        signature,
        signing_input: format!("{header_segment}.{payload_segment}"),
    })
}
