//! Time-bounded key-set cache
//!
//! Readers of a fresh set take only a shared lock and never wait on a
//! refresh. Refreshes are serialized by a separate gate and re-check
//! freshness after acquiring it, so N callers hitting an expired cache
//! produce one outbound fetch, not N.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::fetcher::KeySetFetcher;
use super::types::KeySet;
use crate::error::AuthResult;

/// Cache of the provider's published keys
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # use gallery_auth::jwks::{HttpKeySetFetcher, KeySetCache};
/// # tokio_test::block_on(async {
/// let fetcher = HttpKeySetFetcher::new(
///     "https://www.googleapis.com/oauth2/v3/certs",
///     Duration::from_secs(10),
/// )?;
/// let cache = KeySetCache::new(Arc::new(fetcher), Duration::from_secs(3600));
///
/// let keys = cache.get_keys().await?;
/// println!("{} keys published", keys.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug)]
pub struct KeySetCache {
    fetcher: Arc<dyn KeySetFetcher>,
    ttl: Duration,
    min_refresh_interval: Duration,
    current: RwLock<Option<Arc<KeySet>>>,
    /// Serializes refreshes; holds the time of the last successful fetch
    refresh_gate: Mutex<Option<SystemTime>>,
}

impl KeySetCache {
    /// Create an empty cache
    ///
    /// Forced refreshes are rate limited to one every 5 seconds.
    pub fn new(fetcher: Arc<dyn KeySetFetcher>, ttl: Duration) -> Self {
        Self::with_refresh_interval(fetcher, ttl, Duration::from_secs(5))
    }

    /// Create an empty cache with a custom forced-refresh rate limit
    pub fn with_refresh_interval(
        fetcher: Arc<dyn KeySetFetcher>,
        ttl: Duration,
        min_refresh_interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            ttl,
            min_refresh_interval,
            current: RwLock::new(None),
            refresh_gate: Mutex::new(None),
        }
    }

    /// Current key set, fetching when the held one is empty or expired
    ///
    /// # Errors
    ///
    /// Propagates the fetcher's [`AuthError::Fetch`](crate::AuthError::Fetch).
    /// A failed fetch leaves the previously held set in place.
    pub async fn get_keys(&self) -> AuthResult<Arc<KeySet>> {
        if let Some(set) = self.fresh().await {
            debug!(source = self.fetcher.source(), "Using cached key set");
            return Ok(set);
        }

        let mut last_refresh = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited on the gate
        if let Some(set) = self.fresh().await {
            debug!(source = self.fetcher.source(), "Key set refreshed by concurrent caller");
            return Ok(set);
        }

        self.fetch_and_store(&mut last_refresh).await
    }

    /// Fetch regardless of TTL
    ///
    /// Used when a token names a key the cached set does not have, which is
    /// what key rotation looks like from here. Rate limited: within
    /// `min_refresh_interval` of the last fetch the held set is returned
    /// instead, as long as it is still fresh.
    ///
    /// # Errors
    ///
    /// Propagates the fetcher's [`AuthError::Fetch`](crate::AuthError::Fetch).
    pub async fn refresh(&self) -> AuthResult<Arc<KeySet>> {
        let mut last_refresh = self.refresh_gate.lock().await;

        if let Some(last) = *last_refresh
            && let Ok(since_last) = SystemTime::now().duration_since(last)
            && since_last < self.min_refresh_interval
            && let Some(set) = self.fresh().await
        {
            warn!(
                source = self.fetcher.source(),
                since_last_ms = since_last.as_millis(),
                "Key-set refresh rate limited, using cache"
            );
            return Ok(set);
        }

        self.fetch_and_store(&mut last_refresh).await
    }

    /// Held set if it is non-empty and unexpired
    async fn fresh(&self) -> Option<Arc<KeySet>> {
        let current = self.current.read().await;
        current.as_ref().filter(|set| set.is_fresh()).cloned()
    }

    /// Caller must hold the refresh gate
    async fn fetch_and_store(
        &self,
        last_refresh: &mut Option<SystemTime>,
    ) -> AuthResult<Arc<KeySet>> {
        info!(source = self.fetcher.source(), "Refreshing key set");

        // Nothing is written until the fetch has fully succeeded
        let entries = self.fetcher.fetch().await?;
        let set = Arc::new(KeySet::new(entries, self.ttl));

        {
            let mut current = self.current.write().await;
            *current = Some(Arc::clone(&set));
        }
        *last_refresh = Some(set.fetched_at());

        if set.is_empty() {
            warn!(source = self.fetcher.source(), "Provider published an empty key set");
        }

        Ok(set)
    }

    /// Held set without triggering a fetch, fresh or not
    pub async fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.current.read().await.clone()
    }

    /// Drop the held set so the next call fetches
    pub async fn clear(&self) {
        let mut current = self.current.write().await;
        *current = None;
        debug!(source = self.fetcher.source(), "Key-set cache cleared");
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Where keys come from
    pub fn source(&self) -> &str {
        self.fetcher.source()
    }
}
