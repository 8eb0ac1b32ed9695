//! Port for the object store holding posters and feature videos.
use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::{ByteRange, MediaRef};

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by media store adapters.
    pub enum MediaStoreError {
        /// The object does not exist.
        NotFound { key: String } => "media object '{key}' not found",
        /// The key does not name an object this store can hold.
        InvalidKey { key: String } => "invalid media key '{key}'",
        /// Reading or writing the backing store failed.
        Io { message: String } => "media store I/O failed: {message}",
    }
}

/// Chunked object contents.
pub type MediaChunks = BoxStream<'static, Result<Vec<u8>, MediaStoreError>>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `bytes` in `folder` and return where they can be found.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        folder: &str,
    ) -> Result<MediaRef, MediaStoreError>;

    /// Remove an object. Removing a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<(), MediaStoreError>;

    /// Size of an object in bytes.
    async fn size(&self, key: &str) -> Result<u64, MediaStoreError>;

    /// Stream the bytes covered by `range`, or the whole object when `None`.
    async fn read(&self, key: &str, range: Option<ByteRange>) -> Result<MediaChunks, MediaStoreError>;
}
