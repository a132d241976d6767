//! Error taxonomy for identity token verification
//!
//! Every failure keeps its kind all the way to the caller. Downstream layers
//! branch on [`AuthError::kind`] and never on message text.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the crate
pub type AuthResult<T> = Result<T, AuthError>;

/// Why a key-set fetch failed
///
/// The two subkinds let callers pick a retry policy: transport failures are
/// usually transient, decode failures usually are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Connection failure, timeout, or non-2xx status
    Transport,
    /// Body was not a key-set document (malformed JSON, missing `keys`, oversized)
    Decode,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => f.write_str("transport"),
            Self::Decode => f.write_str("decode"),
        }
    }
}

/// Identity token verification errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The key set could not be retrieved
    #[error("key set fetch failed ({kind}): {message}")]
    Fetch {
        /// Transport or decode
        kind: FetchErrorKind,
        /// Underlying cause
        message: String,
    },

    /// Malformed compact token or payload JSON
    #[error("malformed token: {0}")]
    Format(String),

    /// Published key material could not be turned into an RSA public key
    #[error("malformed key material: {0}")]
    Key(String),

    /// Header declared an algorithm outside the allow-list
    #[error("algorithm {0:?} is not accepted")]
    AlgorithmRejected(String),

    /// No published key carries the token's key id
    #[error("no published key matches kid {0:?}")]
    KeyNotFound(String),

    /// Signature does not match the signing input
    #[error("signature verification failed")]
    SignatureInvalid,

    /// A required claim is absent or not a string
    #[error("claim `{0}` is missing or not a string")]
    Claims(&'static str),

    /// `exp` is in the past (only when expiry enforcement is enabled)
    #[error("token expired")]
    Expired,

    /// `iss` is not an allowed issuer (only when issuer enforcement is enabled)
    #[error("issuer {0:?} is not allowed")]
    IssuerMismatch(String),

    /// `aud` does not contain the configured audience
    #[error("token audience does not include {0:?}")]
    AudienceMismatch(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Kind of an [`AuthError`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`AuthError::Fetch`]
    Fetch(FetchErrorKind),
    /// See [`AuthError::Format`]
    Format,
    /// See [`AuthError::Key`]
    Key,
    /// See [`AuthError::AlgorithmRejected`]
    AlgorithmRejected,
    /// See [`AuthError::KeyNotFound`]
    KeyNotFound,
    /// See [`AuthError::SignatureInvalid`]
    SignatureInvalid,
    /// See [`AuthError::Claims`]
    Claims,
    /// See [`AuthError::Expired`]
    Expired,
    /// See [`AuthError::IssuerMismatch`]
    IssuerMismatch,
    /// See [`AuthError::AudienceMismatch`]
    AudienceMismatch,
    /// See [`AuthError::Config`]
    Config,
}

impl AuthError {
    /// Transport-level fetch failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Fetch {
            kind: FetchErrorKind::Transport,
            message: message.into(),
        }
    }

    /// Decode-level fetch failure
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Fetch {
            kind: FetchErrorKind::Decode,
            message: message.into(),
        }
    }

    /// Malformed token
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Malformed key material
    pub fn key(message: impl Into<String>) -> Self {
        Self::Key(message.into())
    }

    /// Invalid configuration
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch { kind, .. } => ErrorKind::Fetch(*kind),
            Self::Format(_) => ErrorKind::Format,
            Self::Key(_) => ErrorKind::Key,
            Self::AlgorithmRejected(_) => ErrorKind::AlgorithmRejected,
            Self::KeyNotFound(_) => ErrorKind::KeyNotFound,
            Self::SignatureInvalid => ErrorKind::SignatureInvalid,
            Self::Claims(_) => ErrorKind::Claims,
            Self::Expired => ErrorKind::Expired,
            Self::IssuerMismatch(_) => ErrorKind::IssuerMismatch,
            Self::AudienceMismatch(_) => ErrorKind::AudienceMismatch,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether a caller may reasonably try again
    ///
    /// `KeyNotFound` is the expected symptom of key rotation racing the cache
    /// TTL; transport failures are usually transient. Nothing else changes on
    /// a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::KeyNotFound | ErrorKind::Fetch(FetchErrorKind::Transport)
        )
    }

    /// HTTP status a host should answer with
    ///
    /// Key-set failures are the server's problem (503); everything else means
    /// the presented credential was not acceptable (401).
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Fetch(_) => 503,
            ErrorKind::Config => 500,
            _ => 401,
        }
    }
}
