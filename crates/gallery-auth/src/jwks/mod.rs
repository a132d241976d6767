//! JWKS (JSON Web Key Set) fetching and caching
//!
//! - [`fetcher`] - one HTTPS GET per refresh, transport and decode failures kept apart
//! - [`cache`] - TTL-bounded cache with double-checked, serialized refreshes
//! - [`types`] - [`KeySetEntry`] and [`KeySet`]

pub mod cache;
pub mod fetcher;
pub mod types;

pub use cache::KeySetCache;
pub use fetcher::{HttpKeySetFetcher, KeySetFetcher, MAX_RESPONSE_SIZE};
pub use types::{KeySet, KeySetEntry};
