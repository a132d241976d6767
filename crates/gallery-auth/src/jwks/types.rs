//! Key-set data model

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// One published public key
///
/// Only the RSA fields are kept; unknown members of the JWK object
/// (`kty`, `use`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySetEntry {
    /// Key identifier (`kid`)
    #[serde(rename = "kid", default)]
    pub key_id: String,
    /// Base64url big-endian modulus (`n`)
    #[serde(rename = "n", default)]
    pub modulus: String,
    /// Base64url big-endian public exponent (`e`)
    #[serde(rename = "e", default)]
    pub exponent: String,
    /// Declared algorithm (`alg`)
    #[serde(rename = "alg", default)]
    pub algorithm: String,
}

/// Wire shape of the key-set endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct KeySetDocument {
    pub(crate) keys: Vec<KeySetEntry>,
}

/// Expiry used when the configured TTL overflows the clock (about a century)
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Fetched key set together with its validity window
///
/// Replaced wholesale on refresh, never edited entry by entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    entries: Vec<KeySetEntry>,
    fetched_at: SystemTime,
    expires_at: SystemTime,
}

impl KeySet {
    /// A set fetched just now that is valid for `ttl`
    ///
    /// A `ttl` too large for the platform clock saturates to a far-future expiry.
    pub fn new(entries: Vec<KeySetEntry>, ttl: Duration) -> Self {
        let fetched_at = SystemTime::now();
        let expires_at = fetched_at
            .checked_add(ttl)
            .or_else(|| fetched_at.checked_add(FAR_FUTURE))
            .unwrap_or(fetched_at);
        Self {
            entries,
            fetched_at,
            expires_at,
        }
    }

    /// A set with an explicit validity window
    pub fn with_window(
        entries: Vec<KeySetEntry>,
        fetched_at: SystemTime,
        expires_at: SystemTime,
    ) -> Self {
        Self {
            entries,
            fetched_at,
            expires_at,
        }
    }

    /// The empty set, already stale
    pub fn empty() -> Self {
        let now = SystemTime::now();
        Self::with_window(Vec::new(), now, now)
    }

    /// Entries in publication order
    pub fn entries(&self) -> &[KeySetEntry] {
        &self.entries
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the set was fetched
    pub fn fetched_at(&self) -> SystemTime {
        self.fetched_at
    }

    /// When the set stops being served from cache
    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    /// Usable as a cache hit: non-empty and `now < expires_at`
    pub fn is_fresh(&self) -> bool {
        !self.entries.is_empty() && SystemTime::now() < self.expires_at
    }

    /// First entry whose `kid` equals `key_id`
    pub fn find(&self, key_id: &str) -> Option<&KeySetEntry> {
        self.entries.iter().find(|entry| entry.key_id == key_id)
    }

    /// Key ids in publication order
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key_id.as_str())
    }
}
