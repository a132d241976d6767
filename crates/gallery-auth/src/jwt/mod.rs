//! Compact signed token handling
//!
//! ```text
//! token text ──parse──▶ CompactToken ──verify(key set)──▶ Claims ──extract──▶ VerifiedIdentity
//!                          │                 │
//!                      Header (kid, alg)   key::reconstruct(n, e)
//! ```
//!
//! # Modules
//!
//! - `base64url` - padding-tolerant decoding
//! - `token` - splitting and header decoding
//! - `key` - RSA public key from JWK modulus/exponent
//! - `signature` - RS256 verification against a key set
//! - `claims` - payload decoding, identity extraction, optional claim policy

pub mod base64url;
pub mod claims;
pub mod key;
pub mod signature;
pub mod token;

pub use claims::{Claims, ClaimsPolicy, GOOGLE_ISSUERS, VerifiedIdentity, extract};
pub use key::reconstruct;
pub use signature::{SUPPORTED_ALGORITHM, verify};
pub use token::{CompactToken, Header, parse};
