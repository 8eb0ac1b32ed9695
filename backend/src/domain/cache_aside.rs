//! Read-through and write-invalidate helper shared by the services.
//!
//! The cache is advisory. A failing cache never fails a request: reads fall
//! through to persistence and failed writes or deletes are logged. Payloads are
//! JSON so any adapter that stores strings can hold them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::Error;
use crate::domain::ports::{CacheKey, CacheStore};

/// Time-to-live per family of cached read models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub movies: Duration,
    pub showtimes: Duration,
    pub users: Duration,
    pub reservations: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            movies: Duration::from_secs(600),
            showtimes: Duration::from_secs(600),
            users: Duration::from_secs(300),
            reservations: Duration::from_secs(300),
        }
    }
}

/// Cache-aside wrapper over a [`CacheStore`].
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
}

impl CacheAside {
    /// Wrap a cache store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Return the cached value for `key`, or load, cache, and return it.
    ///
    /// `load` returning `Ok(None)` is passed through and nothing is cached.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        load: F,
    ) -> Result<Option<T>, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>, Error>> + Send,
    {
        if let Some(hit) = self.read(key).await {
            return Ok(Some(hit));
        }
        debug!(%key, "cache miss");
        let loaded = load().await?;
        if let Some(value) = loaded.as_ref() {
            self.write(key, value, ttl).await;
        }
        Ok(loaded)
    }

    /// Delete every key in `keys`, logging failures.
    pub async fn invalidate<I>(&self, keys: I)
    where
        I: IntoIterator<Item = CacheKey> + Send,
        I::IntoIter: Send,
    {
        for key in keys {
            if let Err(error) = self.store.delete(&key).await {
                warn!(%key, %error, "cache invalidation failed");
            }
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let payload = match self.store.get(key).await {
            Ok(payload) => payload?,
            Err(error) => {
                warn!(%key, %error, "cache read failed; falling back to persistence");
                return None;
            }
        };
        match serde_json::from_str(&payload) {
            Ok(value) => {
                debug!(%key, "cache hit");
                Some(value)
            }
            Err(error) => {
                warn!(%key, %error, "discarding unreadable cache entry");
                if let Err(delete_error) = self.store.delete(key).await {
                    warn!(%key, error = %delete_error, "cache invalidation failed");
                }
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%key, %error, "failed to serialise cache entry");
                return;
            }
        };
        if let Err(error) = self.store.set(key, &payload, ttl).await {
            warn!(%key, %error, "cache write failed");
        }
    }
}
