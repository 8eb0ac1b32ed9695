//! Cache adapters implementing the `CacheStore` port.
//!
//! [`RedisCacheStore`] is the production adapter. [`MemoryCacheStore`] keeps
//! entries in process and backs local development and the integration tests.

mod memory;
mod redis_store;

pub use memory::MemoryCacheStore;
pub use redis_store::{RedisCacheStore, RedisConfig};
