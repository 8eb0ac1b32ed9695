//! Redis-backed `CacheStore` using `bb8-redis` for connection pooling.
//!
//! Every write applies a random jitter on top of the requested TTL so a burst
//! of entries cached together does not expire together.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::Pool;
use bb8_redis::redis::{self, AsyncCommands};
use rand::Rng;
use tracing::debug;

use crate::domain::ports::{CacheKey, CacheStore, CacheStoreError};

/// Connection settings for [`RedisCacheStore`].
#[derive(Debug, Clone)]
pub struct RedisConfig {
    url: String,
    max_size: u32,
    connection_timeout: Duration,
    max_jitter: Duration,
}

impl RedisConfig {
    /// Settings with 8 connections, a 2 second checkout timeout, and up to
    /// 30 seconds of TTL jitter.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_size: 8,
            connection_timeout: Duration::from_secs(2),
            max_jitter: Duration::from_secs(30),
        }
    }

    /// Set the maximum number of pooled connections.
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the upper bound of the random TTL extension.
    #[must_use]
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }
}

/// Redis cache adapter.
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool<RedisConnectionManager>,
    max_jitter: Duration,
}

fn backend_error(error: impl std::fmt::Display) -> CacheStoreError {
    CacheStoreError::backend(error.to_string())
}

/// Whole seconds to keep an entry: `ttl` plus jitter, at least one second.
fn expiry_seconds(ttl: Duration, jitter: Duration) -> u64 {
    ttl.saturating_add(jitter).as_secs().max(1)
}

impl RedisCacheStore {
    /// Connect a pool to the Redis server at `config.url`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheStoreError::Backend`] when the URL is invalid or the
    /// pool cannot be built.
    pub async fn connect(config: RedisConfig) -> Result<Self, CacheStoreError> {
        let manager = RedisConnectionManager::new(config.url.as_str()).map_err(backend_error)?;
        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(backend_error)?;
        Ok(Self {
            pool,
            max_jitter: config.max_jitter,
        })
    }

    fn jitter(&self) -> Duration {
        let bound = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=bound))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        let mut conn = self.pool.get().await.map_err(backend_error)?;
        let value: Option<String> = conn.get(key.to_string()).await.map_err(backend_error)?;
        debug!(%key, hit = value.is_some(), "redis get");
        Ok(value)
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        let seconds = expiry_seconds(ttl, self.jitter());
        let mut conn = self.pool.get().await.map_err(backend_error)?;
        let () = redis::cmd("SET")
            .arg(key.to_string())
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheStoreError> {
        let mut conn = self.pool.get().await.map_err(backend_error)?;
        let _removed: i64 = conn.del(key.to_string()).await.map_err(backend_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_secs(600), Duration::ZERO, 600)]
    #[case(Duration::from_secs(600), Duration::from_millis(29_999), 629)]
    #[case(Duration::from_millis(10), Duration::ZERO, 1)]
    fn expiry_adds_jitter_and_never_reaches_zero(
        #[case] ttl: Duration,
        #[case] jitter: Duration,
        #[case] expected: u64,
    ) {
        assert_eq!(expiry_seconds(ttl, jitter), expected);
    }

    #[rstest]
    fn config_builders_override_defaults() {
        let config = RedisConfig::new("redis://localhost:6379")
            .with_max_size(2)
            .with_max_jitter(Duration::ZERO);
        assert_eq!(config.max_size, 2);
        assert_eq!(config.max_jitter, Duration::ZERO);
    }

    #[rstest]
    #[tokio::test]
    async fn invalid_url_is_a_backend_error() {
        let err = RedisCacheStore::connect(RedisConfig::new("not a url"))
            .await
            .err()
            .expect("invalid url rejected");
        assert!(matches!(err, CacheStoreError::Backend { .. }));
    }
}
