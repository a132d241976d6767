//! Token claims and identity extraction
//!
//! Claims arrive as an open JSON object. Required members are checked once,
//! here, and the caller receives a typed [`VerifiedIdentity`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::base64url;
use crate::error::{AuthError, AuthResult};

/// Decoded token payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Decode a base64url payload segment
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Format`] if the segment is not base64url or does
    /// not hold a JSON object.
    pub fn decode(payload_segment: &str) -> AuthResult<Self> {
        let json = base64url::decode(payload_segment)
            .map_err(|e| AuthError::format(format!("payload is not base64url: {e}")))?;
        serde_json::from_slice(&json)
            .map_err(|e| AuthError::format(format!("payload is not a JSON object: {e}")))
    }

    /// Raw claim value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Claim value if it is a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// All claims
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Identity surfaced to the host after successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// Provider's stable user id (`sub`)
    pub subject: String,
    /// Email address (`email`)
    pub email: String,
    /// Display name (`name`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Avatar URL (`picture`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Pull the identity fields out of verified claims
///
/// # Errors
///
/// Returns [`AuthError::Claims`] when `sub` or `email` is absent or not a
/// string. `name` and `picture` are optional; non-string values are dropped.
pub fn extract(claims: &Claims) -> AuthResult<VerifiedIdentity> {
    let subject = claims.get_str("sub").ok_or(AuthError::Claims("sub"))?;
    let email = claims.get_str("email").ok_or(AuthError::Claims("email"))?;

    Ok(VerifiedIdentity {
        subject: subject.to_string(),
        email: email.to_string(),
        name: claims.get_str("name").map(str::to_string),
        picture: claims.get_str("picture").map(str::to_string),
    })
}

/// Google's two spellings of its issuer
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Optional checks on top of signature verification
///
/// All checks are off by default: a verified token certifies only that a
/// currently published key signed it. Hosts that need freshness or audience
/// binding turn the relevant check on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimsPolicy {
    /// Reject tokens without `exp` or with `exp` in the past
    #[serde(default)]
    pub require_unexpired: bool,
    /// Clock skew allowed on `exp`
    #[serde(default)]
    pub leeway: Duration,
    /// If non-empty, `iss` must be one of these
    #[serde(default)]
    pub allowed_issuers: Vec<String>,
    /// If set, `aud` (string or array) must contain it
    #[serde(default)]
    pub audience: Option<String>,
}

impl ClaimsPolicy {
    /// Expiry, Google issuer and audience all enforced
    pub fn google_strict(client_id: impl Into<String>) -> Self {
        Self {
            require_unexpired: true,
            leeway: Duration::from_secs(60),
            allowed_issuers: GOOGLE_ISSUERS.iter().map(|s| (*s).to_string()).collect(),
            audience: Some(client_id.into()),
        }
    }

    /// Whether any check is enabled
    pub fn is_enforcing(&self) -> bool {
        self.require_unexpired || !self.allowed_issuers.is_empty() || self.audience.is_some()
    }

    /// Apply the enabled checks at time `now`
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Expired`], [`AuthError::IssuerMismatch`] or
    /// [`AuthError::AudienceMismatch`] for the first failing check.
    pub fn check(&self, claims: &Claims, now: SystemTime) -> AuthResult<()> {
        if self.require_unexpired {
            let exp = claims
                .get("exp")
                .and_then(Value::as_u64)
                .ok_or(AuthError::Expired)?;
            // An instant past the clock's range is never in the past
            let expires_at = UNIX_EPOCH
                .checked_add(Duration::from_secs(exp))
                .and_then(|t| t.checked_add(self.leeway));
            if expires_at.is_some_and(|t| t <= now) {
                return Err(AuthError::Expired);
            }
        }

        if !self.allowed_issuers.is_empty() {
            let issuer = claims.get_str("iss").unwrap_or_default();
            if !self.allowed_issuers.iter().any(|allowed| allowed == issuer) {
                return Err(AuthError::IssuerMismatch(issuer.to_string()));
            }
        }

        if let Some(expected) = &self.audience {
            let matches = match claims.get("aud") {
                Some(Value::String(aud)) => aud == expected,
                Some(Value::Array(auds)) => auds.iter().any(|aud| aud.as_str() == Some(expected)),
                _ => false,
            };
            if !matches {
                return Err(AuthError::AudienceMismatch(expected.clone()));
            }
        }

        Ok(())
    }
}
