//! # Gallery Auth - Google ID Token Verification
//!
//! Verifies Google-issued identity tokens presented by the photo gallery's
//! clients and turns them into a typed [`VerifiedIdentity`].
//!
//! ## Pipeline
//!
//! 1. The provider's published signing keys are fetched and cached for an hour
//!    ([`jwks`]). Concurrent callers hitting an expired cache share one fetch.
//! 2. The compact token is split and its header decoded ([`jwt::token`]).
//! 3. The key named by `kid` is rebuilt from its modulus and exponent
//!    ([`jwt::key`]) and the RS256 signature checked ([`jwt::signature`]).
//! 4. `sub` and `email` are extracted from the claims ([`jwt::claims`]).
//!
//! A token naming an unknown key triggers one forced key-set refresh and a
//! single retry, which covers key rotation inside the cache TTL.
//!
//! ## Architecture
//!
//! - [`error`] - `AuthError` and its kinds
//! - [`config`] - `GoogleAuthConfig`, environment loading
//! - [`jwks`] - key-set fetcher and cache
//! - [`jwt`] - token parsing, key reconstruction, signature, claims
//! - [`verifier`] - `IdentityVerifier` and its live and development variants
//! - `tower` - bearer-token middleware (feature `middleware`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gallery_auth::{GoogleAuthConfig, IdentityVerifier, build_verifier};
//!
//! # tokio_test::block_on(async {
//! let verifier = build_verifier(&GoogleAuthConfig::from_env()?)?;
//!
//! match verifier.verify("eyJhbGciOiJSUzI1NiIs...").await {
//!     Ok(identity) => println!("hello {}", identity.email),
//!     Err(e) if e.status_code() == 503 => eprintln!("try again later: {e}"),
//!     Err(e) => eprintln!("rejected: {e}"),
//! }
//! # Ok::<(), gallery_auth::AuthError>(())
//! # });
//! ```
//!
//! ## What a verified token certifies
//!
//! By default only that one of the provider's currently published keys signed
//! it with RS256. Expiry, issuer and audience are not checked unless a
//! [`ClaimsPolicy`] enables them; see [`ClaimsPolicy::google_strict`].
//!
//! ## Feature Flags
//!
//! - `middleware` (alias `tower`) - Tower `Layer`/`Service` for bearer tokens
//! - `full` - All features enabled

#![cfg_attr(docsrs, feature(doc_cfg))]

// Submodules
pub mod config;
pub mod error;
pub mod jwks;
pub mod jwt;
pub mod verifier;

#[cfg(feature = "middleware")]
#[cfg_attr(docsrs, doc(cfg(feature = "middleware")))]
pub mod tower;

#[cfg(test)]
mod testutil;

#[doc(inline)]
pub use config::{GoogleAuthConfig, VerifierMode};

#[doc(inline)]
pub use error::{AuthError, AuthResult, ErrorKind, FetchErrorKind};

#[doc(inline)]
pub use jwks::{KeySet, KeySetCache, KeySetEntry};

#[doc(inline)]
pub use jwt::{ClaimsPolicy, VerifiedIdentity};

#[doc(inline)]
pub use verifier::{FixedIdentityVerifier, GoogleIdentityVerifier, IdentityVerifier, build_verifier};
