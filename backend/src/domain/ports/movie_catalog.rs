//! Driving port for the movie catalogue and video streaming.
use async_trait::async_trait;

use crate::domain::{
    ByteRange, Error, MediaAsset, Movie, MovieDraft, MoviePatch, MovieTitle, MovieWithShowtimes,
    Principal,
};

use super::MediaChunks;

/// Content type reported for every streamed video.
pub const STREAM_CONTENT_TYPE: &str = "video/mp4";

/// Video bytes ready to be written to a client.
pub struct MovieStream {
    /// Total object size in bytes.
    pub size: u64,
    /// Span being sent; `None` for the whole object.
    pub range: Option<ByteRange>,
    pub chunks: MediaChunks,
}

impl MovieStream {
    /// Bytes that will be sent.
    pub const fn content_length(&self) -> u64 {
        match self.range {
            Some(range) => range.len(),
            None => self.size,
        }
    }
}

impl std::fmt::Debug for MovieStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieStream")
            .field("size", &self.size)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Add a movie with its poster and video; admin only.
    async fn create_movie(
        &self,
        principal: &Principal,
        draft: MovieDraft,
        poster: Option<MediaAsset>,
        video: Option<MediaAsset>,
    ) -> Result<Movie, Error>;

    /// Fetch a movie with its showtimes through the cache.
    async fn find_movie(&self, title: &MovieTitle) -> Result<MovieWithShowtimes, Error>;

    /// List every movie with its showtimes through the cache.
    async fn list_movies(&self) -> Result<Vec<MovieWithShowtimes>, Error>;

    /// Change a movie, replacing only the supplied media; admin only.
    async fn update_movie(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        patch: MoviePatch,
        poster: Option<MediaAsset>,
        video: Option<MediaAsset>,
    ) -> Result<Movie, Error>;

    /// Remove a movie without showtimes; admin only.
    async fn delete_movie(&self, principal: &Principal, title: &MovieTitle) -> Result<Movie, Error>;

    /// Open the movie's video, honouring a `Range` header when given.
    async fn stream_movie(
        &self,
        title: &MovieTitle,
        range_header: Option<String>,
    ) -> Result<MovieStream, Error>;
}
