//! Base64url decoding tolerant of missing padding

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;

/// Decode a base64url segment, padded or not
///
/// Compact tokens and JWK members are emitted without trailing `=`, so the
/// input is right-padded to a multiple of 4 before decoding.
///
/// # Errors
///
/// Returns the underlying [`base64::DecodeError`] for characters outside the
/// URL-safe alphabet or impossible lengths.
pub fn decode(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let remainder = segment.len() % 4;
    if remainder == 0 {
        return URL_SAFE.decode(segment);
    }

    let mut padded = String::with_capacity(segment.len() + 4 - remainder);
    padded.push_str(segment);
    padded.extend(std::iter::repeat_n('=', 4 - remainder));
    URL_SAFE.decode(padded)
}
