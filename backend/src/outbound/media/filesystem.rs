//! Filesystem-backed `MediaStore` confined to one directory with `cap-std`.
//!
//! Objects live at `<folder>/<uuid>.<ext>` below the root and are served from
//! `<public_base>/<key>`. All file access runs on the blocking pool; reads are
//! streamed in fixed-size chunks so a large video never sits in memory whole.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use futures_util::StreamExt;
use futures_util::stream;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ByteRange;
use crate::domain::MediaRef;
use crate::domain::ports::{MediaChunks, MediaStore, MediaStoreError};

const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Media objects stored under a local directory.
#[derive(Clone)]
pub struct FilesystemMediaStore {
    root: Arc<Dir>,
    public_base: String,
    chunk_size: usize,
}

fn io_error(error: &io::Error, key: &str) -> MediaStoreError {
    if error.kind() == io::ErrorKind::NotFound {
        MediaStoreError::not_found(key)
    } else {
        MediaStoreError::io(format!("{key}: {error}"))
    }
}

fn join_error(error: &tokio::task::JoinError) -> MediaStoreError {
    MediaStoreError::io(format!("blocking task failed: {error}"))
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => "bin",
    }
}

/// Accept only `<folder>/<file>` keys made of plain path segments.
fn checked_key(key: &str) -> Result<&Path, MediaStoreError> {
    let path = Path::new(key);
    let plain = path.components().count() == 2
        && path.components().all(|part| match part {
            Component::Normal(segment) => segment
                .to_str()
                .is_some_and(|s| !s.starts_with('.') && s.chars().all(is_key_char)),
            _ => false,
        });
    if plain {
        Ok(path)
    } else {
        Err(MediaStoreError::invalid_key(key))
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

impl FilesystemMediaStore {
    /// Open (creating if needed) the directory at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaStoreError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(root: impl AsRef<Path>, public_base: impl Into<String>) -> Result<Self, MediaStoreError> {
        let root = root.as_ref();
        let describe = |error: io::Error| MediaStoreError::io(format!("{}: {error}", root.display()));
        Dir::create_ambient_dir_all(root, ambient_authority()).map_err(describe)?;
        let dir = Dir::open_ambient_dir(root, ambient_authority()).map_err(describe)?;
        Ok(Self {
            root: Arc::new(dir),
            public_base: public_base.into().trim_end_matches('/').to_owned(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Override the streaming chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    async fn blocking<T, F>(&self, key: String, op: F) -> Result<T, MediaStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir, &str) -> Result<T, MediaStoreError> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || op(&root, &key))
            .await
            .map_err(|err| join_error(&err))?
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        folder: &str,
    ) -> Result<MediaRef, MediaStoreError> {
        let key = format!("{folder}/{}.{}", Uuid::new_v4().simple(), extension_for(content_type));
        checked_key(&key)?;
        let folder = folder.to_owned();
        let stored = self
            .blocking(key, move |root, key| {
                root.create_dir_all(&folder).map_err(|err| io_error(&err, key))?;
                let staging = format!("{folder}/.{}.partial", Uuid::new_v4().simple());
                root.write(&staging, &bytes).map_err(|err| io_error(&err, key))?;
                root.rename(&staging, root, key).map_err(|err| io_error(&err, key))?;
                Ok(key.to_owned())
            })
            .await?;
        debug!(key = %stored, "media object stored");
        Ok(MediaRef {
            url: format!("{}/{stored}", self.public_base),
            key: stored,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), MediaStoreError> {
        checked_key(key)?;
        self.blocking(key.to_owned(), |root, key| match root.remove_file(key) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&err, key)),
        })
        .await
    }

    async fn size(&self, key: &str) -> Result<u64, MediaStoreError> {
        checked_key(key)?;
        self.blocking(key.to_owned(), |root, key| {
            root.metadata(key)
                .map(|meta| meta.len())
                .map_err(|err| io_error(&err, key))
        })
        .await
    }

    async fn read(&self, key: &str, range: Option<ByteRange>) -> Result<MediaChunks, MediaStoreError> {
        checked_key(key)?;
        let (file, remaining) = self
            .blocking(key.to_owned(), move |root, key| {
                let mut file = root.open(key).map_err(|err| io_error(&err, key))?;
                let size = file.metadata().map_err(|err| io_error(&err, key))?.len();
                let (start, len) = range.map_or((0, size), |span| (span.start, span.len()));
                file.seek(SeekFrom::Start(start))
                    .map_err(|err| io_error(&err, key))?;
                Ok((file, len))
            })
            .await?;

        let chunk_size = self.chunk_size;
        let key = key.to_owned();
        let chunks = stream::unfold(Some((file, remaining)), move |state| {
            let key = key.clone();
            async move {
                let (mut file, remaining) = state?;
                if remaining == 0 {
                    return None;
                }
                let want = usize::try_from(remaining).map_or(chunk_size, |left| left.min(chunk_size));
                let read = tokio::task::spawn_blocking(move || {
                    let mut buf = vec![0_u8; want];
                    file.read_exact(&mut buf).map(|()| (file, buf))
                })
                .await;
                match read {
                    Ok(Ok((file, buf))) => {
                        let left = remaining.saturating_sub(buf.len() as u64);
                        Some((Ok(buf), Some((file, left))))
                    }
                    Ok(Err(err)) => Some((Err(io_error(&err, &key)), None)),
                    Err(err) => Some((Err(join_error(&err)), None)),
                }
            }
        });
        Ok(chunks.boxed())
    }
}
