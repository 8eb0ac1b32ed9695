//! Port interface for the key-value cache holding serialised read models.
use std::time::Duration;

use async_trait::async_trait;

use super::{CacheKey, define_port_error};

define_port_error! {
    /// Errors surfaced by cache adapters.
    pub enum CacheStoreError {
        /// Cache backend is unavailable or timing out.
        Backend { message: String } => "cache backend failure: {message}",
    }
}

/// Minimal key-value contract: single-key reads, writes with a TTL, and deletes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the payload stored under `key`.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheStoreError>;

    /// Remove `key`. Deleting a missing key succeeds.
    async fn delete(&self, key: &CacheKey) -> Result<(), CacheStoreError>;
}

/// Cache that never holds anything; every read misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCacheStore;

#[async_trait]
impl CacheStore for FixtureCacheStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &CacheKey, _value: &str, _ttl: Duration) -> Result<(), CacheStoreError> {
        Ok(())
    }

    async fn delete(&self, _key: &CacheKey) -> Result<(), CacheStoreError> {
        Ok(())
    }
}
