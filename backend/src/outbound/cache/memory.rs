//! In-process `CacheStore` with clock-driven expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::domain::ports::{CacheKey, CacheStore, CacheStoreError};

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Cache held in a mutex-guarded map. Expired entries are dropped on read.
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    /// Create an empty cache reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        let now = self.clock.utc();
        let rendered = key.to_string();
        let mut entries = self.entries();
        match entries.get(&rendered) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(&rendered);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<(), CacheStoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|err| CacheStoreError::backend(format!("ttl out of range: {err}")))?;
        let entry = Entry {
            value: value.to_owned(),
            expires_at: self.clock.utc() + ttl,
        };
        self.entries().insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheStoreError> {
        self.entries().remove(&key.to_string());
        Ok(())
    }
}
