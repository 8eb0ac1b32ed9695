//! Movie catalogue service.
//!
//! Implements the [`MovieCatalog`] driving port. Uploads happen before the row
//! is written, so any failure after an upload removes the uploaded objects
//! again. Media clean-up is best effort and only logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::ports::{
    CacheKey, MediaStore, MediaStoreError, MovieCatalog, MovieChanges, MoviePersistenceError,
    MovieRepository, MovieStream, NewMovieRecord, VideoProbe,
};
use crate::domain::{
    ByteRange, CacheAside, CacheTtls, Error, MediaAsset, MediaKind, MediaRef, Movie, MovieDraft,
    MovieId, MoviePatch, MovieTitle, MovieValidationError, MovieWithShowtimes, Principal,
    require_media,
};

/// Catalogue service implementing [`MovieCatalog`].
#[derive(Clone)]
pub struct CatalogService<M, S, P> {
    movies: Arc<M>,
    media: Arc<S>,
    probe: Arc<P>,
    cache: CacheAside,
    ttl: Duration,
}

impl<M, S, P> CatalogService<M, S, P> {
    /// Create a service over the given repository, media store, and probe.
    pub fn new(
        movies: Arc<M>,
        media: Arc<S>,
        probe: Arc<P>,
        cache: CacheAside,
        ttls: &CacheTtls,
    ) -> Self {
        Self {
            movies,
            media,
            probe,
            cache,
            ttl: ttls.movies,
        }
    }
}

pub(crate) fn map_movie_error(error: MoviePersistenceError) -> Error {
    match error {
        MoviePersistenceError::Connection { message } => {
            Error::service_unavailable(format!("movie repository unavailable: {message}"))
        }
        MoviePersistenceError::Query { message } => {
            Error::internal(format!("movie repository error: {message}"))
        }
        error @ (MoviePersistenceError::DuplicateTitle { .. }
        | MoviePersistenceError::HasShowtimes { .. }) => Error::conflict(error.to_string()),
    }
}

/// Reservation list keys of everyone holding seats for the movie.
///
/// Runs after the write has committed, so a failed lookup is logged and only
/// `reservations:all` is returned.
pub(crate) async fn holder_keys<M>(movies: &M, movie_id: &MovieId) -> Vec<CacheKey>
where
    M: MovieRepository + ?Sized,
{
    match movies.reservation_holders(movie_id).await {
        Ok(holders) => CacheKey::for_holders(&holders),
        Err(error) => {
            warn!(%movie_id, %error, "failed to list reservation holders");
            vec![CacheKey::AllReservations]
        }
    }
}

fn map_media_error(error: MediaStoreError) -> Error {
    match error {
        MediaStoreError::NotFound { .. } => Error::not_found("video not found"),
        MediaStoreError::InvalidKey { key } => {
            Error::internal(format!("movie references an invalid media key: {key}"))
        }
        MediaStoreError::Io { message } => {
            Error::service_unavailable(format!("media store unavailable: {message}"))
        }
    }
}

fn movie_not_found() -> Error {
    Error::not_found("movie not found")
}

fn take_media(asset: Option<MediaAsset>, kind: MediaKind) -> Result<MediaAsset, Error> {
    require_media(asset.as_ref(), kind)?;
    asset.ok_or_else(|| MovieValidationError::MissingMedia { kind }.into())
}

fn validate_optional(asset: Option<&MediaAsset>, kind: MediaKind) -> Result<(), Error> {
    if let Some(asset) = asset {
        asset.validate(kind)?;
    }
    Ok(())
}

fn patch_is_empty(patch: &MoviePatch, poster: Option<&MediaAsset>, video: Option<&MediaAsset>) -> bool {
    patch.title.is_none()
        && patch.description.is_none()
        && patch.genre.is_none()
        && poster.is_none()
        && video.is_none()
}

impl<M, S, P> CatalogService<M, S, P>
where
    M: MovieRepository,
    S: MediaStore,
    P: VideoProbe,
{
    async fn existing(&self, title: &MovieTitle) -> Result<Movie, Error> {
        self.movies
            .find_by_title(title)
            .await
            .map_err(map_movie_error)?
            .ok_or_else(movie_not_found)
    }

    async fn ensure_title_free(&self, title: &MovieTitle) -> Result<(), Error> {
        let taken = self
            .movies
            .find_by_title(title)
            .await
            .map_err(map_movie_error)?
            .is_some();
        if taken {
            return Err(map_movie_error(MoviePersistenceError::duplicate_title(
                title.as_str(),
            )));
        }
        Ok(())
    }

    async fn upload(&self, asset: MediaAsset, kind: MediaKind) -> Result<MediaRef, Error> {
        self.media
            .upload(asset.bytes, &asset.content_type, kind.folder())
            .await
            .map_err(map_media_error)
    }

    /// Remove stored objects, logging failures.
    async fn discard(&self, refs: Vec<MediaRef>) {
        for media in refs {
            if let Err(error) = self.media.delete(&media.key).await {
                warn!(key = %media.key, %error, "failed to remove media object");
            }
        }
    }

    /// Upload the optional replacements, removing earlier uploads on failure.
    async fn upload_replacements(
        &self,
        poster: Option<MediaAsset>,
        video: Option<MediaAsset>,
    ) -> Result<(Option<MediaRef>, Option<MediaRef>), Error> {
        let poster = match poster {
            Some(asset) => Some(self.upload(asset, MediaKind::Poster).await?),
            None => None,
        };
        let video = match video {
            Some(asset) => match self.upload(asset, MediaKind::Video).await {
                Ok(stored) => Some(stored),
                Err(error) => {
                    self.discard(poster.into_iter().collect()).await;
                    return Err(error);
                }
            },
            None => None,
        };
        Ok((poster, video))
    }
}

#[async_trait]
impl<M, S, P> MovieCatalog for CatalogService<M, S, P>
where
    M: MovieRepository,
    S: MediaStore,
    P: VideoProbe,
{
    async fn create_movie(
        &self,
        principal: &Principal,
        draft: MovieDraft,
        poster: Option<MediaAsset>,
        video: Option<MediaAsset>,
    ) -> Result<Movie, Error> {
        principal.require_admin()?;
        let poster = take_media(poster, MediaKind::Poster)?;
        let video = take_media(video, MediaKind::Video)?;
        self.ensure_title_free(&draft.title).await?;

        let metadata = self.probe.probe(&video.bytes, draft.declared_duration).await;
        let poster_ref = self.upload(poster, MediaKind::Poster).await?;
        let video_ref = match self.upload(video, MediaKind::Video).await {
            Ok(stored) => stored,
            Err(error) => {
                self.discard(vec![poster_ref]).await;
                return Err(error);
            }
        };

        let record = NewMovieRecord {
            title: draft.title,
            description: draft.description,
            genre: draft.genre,
            poster: poster_ref,
            video: video_ref,
            duration_seconds: metadata.duration_seconds,
            resolutions: metadata.resolutions,
        };
        let movie = match self.movies.insert(&record).await {
            Ok(movie) => movie,
            Err(error) => {
                self.discard(vec![record.poster.clone(), record.video.clone()])
                    .await;
                return Err(map_movie_error(error));
            }
        };

        self.cache.invalidate(CacheKey::for_movie(&movie.title)).await;
        info!(movie_id = %movie.id, title = %movie.title, "movie created");
        Ok(movie)
    }

    async fn find_movie(&self, title: &MovieTitle) -> Result<MovieWithShowtimes, Error> {
        self.cache
            .get_or_load(&CacheKey::Movie(title.clone()), self.ttl, || async {
                self.movies
                    .find_with_showtimes(title)
                    .await
                    .map_err(map_movie_error)
            })
            .await?
            .ok_or_else(movie_not_found)
    }

    async fn list_movies(&self) -> Result<Vec<MovieWithShowtimes>, Error> {
        let movies = self
            .cache
            .get_or_load(&CacheKey::AllMovies, self.ttl, || async {
                self.movies
                    .list_with_showtimes()
                    .await
                    .map(Some)
                    .map_err(map_movie_error)
            })
            .await?;
        Ok(movies.unwrap_or_default())
    }

    async fn update_movie(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        patch: MoviePatch,
        poster: Option<MediaAsset>,
        video: Option<MediaAsset>,
    ) -> Result<Movie, Error> {
        principal.require_admin()?;
        if patch_is_empty(&patch, poster.as_ref(), video.as_ref()) {
            return Err(Error::invalid_request("no changes supplied"));
        }
        validate_optional(poster.as_ref(), MediaKind::Poster)?;
        validate_optional(video.as_ref(), MediaKind::Video)?;

        let current = self.existing(title).await?;
        if let Some(new_title) = patch.title.as_ref().filter(|new| *new != &current.title) {
            self.ensure_title_free(new_title).await?;
        }

        let metadata = match video.as_ref() {
            Some(asset) => Some(self.probe.probe(&asset.bytes, patch.declared_duration).await),
            None => None,
        };
        let (poster_ref, video_ref) = self.upload_replacements(poster, video).await?;

        // Duration and resolutions only change together with a new video.
        let (duration_seconds, resolutions) = metadata
            .map(|metadata| (metadata.duration_seconds, metadata.resolutions))
            .unzip();
        let changes = MovieChanges {
            title: patch.title,
            description: patch.description,
            genre: patch.genre,
            poster: poster_ref,
            video: video_ref,
            duration_seconds,
            resolutions,
        };

        let updated = match self.movies.update(&current.id, &changes).await {
            Ok(Some(movie)) => movie,
            failed => {
                let error = match failed {
                    Err(error) => map_movie_error(error),
                    Ok(_) => movie_not_found(),
                };
                let uploaded: Vec<MediaRef> =
                    [changes.poster, changes.video].into_iter().flatten().collect();
                self.discard(uploaded).await;
                return Err(error);
            }
        };

        let mut replaced = Vec::new();
        if changes.poster.is_some() {
            replaced.push(current.poster.clone());
        }
        if changes.video.is_some() {
            replaced.push(current.video.clone());
        }
        self.discard(replaced).await;

        let mut keys = CacheKey::for_movie(&current.title).to_vec();
        keys.extend(CacheKey::for_movie(&updated.title));
        keys.extend(holder_keys(self.movies.as_ref(), &updated.id).await);
        self.cache.invalidate(keys).await;
        info!(movie_id = %updated.id, title = %updated.title, "movie updated");
        Ok(updated)
    }

    async fn delete_movie(&self, principal: &Principal, title: &MovieTitle) -> Result<Movie, Error> {
        principal.require_admin()?;
        let current = self.existing(title).await?;
        let deleted = self
            .movies
            .delete(&current.id)
            .await
            .map_err(map_movie_error)?
            .ok_or_else(movie_not_found)?;

        self.discard(vec![deleted.poster.clone(), deleted.video.clone()])
            .await;
        self.cache.invalidate(CacheKey::for_movie(&deleted.title)).await;
        info!(movie_id = %deleted.id, title = %deleted.title, "movie deleted");
        Ok(deleted)
    }

    async fn stream_movie(
        &self,
        title: &MovieTitle,
        range_header: Option<String>,
    ) -> Result<MovieStream, Error> {
        let movie = self.existing(title).await?;
        let size = self
            .media
            .size(&movie.video.key)
            .await
            .map_err(map_media_error)?;
        let range = range_header
            .as_deref()
            .map(|header| ByteRange::parse(header, size))
            .transpose()?;
        let chunks = self
            .media
            .read(&movie.video.key, range)
            .await
            .map_err(map_media_error)?;
        Ok(MovieStream {
            size,
            range,
            chunks,
        })
    }
}

#[cfg(test)]
#[path = "catalog_service_tests.rs"]
mod tests;
