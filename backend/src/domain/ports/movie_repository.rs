//! Port abstraction for the movie catalogue store.
use async_trait::async_trait;

use crate::domain::{MediaRef, Movie, MovieId, MovieTitle, MovieWithShowtimes, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by movie repository adapters.
    pub enum MoviePersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "movie repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "movie repository query failed: {message}",
        /// Another movie already uses the title.
        DuplicateTitle { title: String } => "movie titled '{title}' already exists",
        /// The movie still has showtimes and cannot be removed.
        HasShowtimes { title: String } => "movie '{title}' still has showtimes",
    }
}

/// Row to insert for a new movie.
#[derive(Debug, Clone)]
pub struct NewMovieRecord {
    pub title: MovieTitle,
    pub description: String,
    pub genre: String,
    pub poster: MediaRef,
    pub video: MediaRef,
    pub duration_seconds: u32,
    pub resolutions: Vec<String>,
}

/// Column changes for an existing movie.
#[derive(Debug, Clone, Default)]
pub struct MovieChanges {
    pub title: Option<MovieTitle>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub poster: Option<MediaRef>,
    pub video: Option<MediaRef>,
    pub duration_seconds: Option<u32>,
    pub resolutions: Option<Vec<String>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieRepository: Send + Sync {
    /// Insert a movie; fails with `DuplicateTitle` on a clash.
    async fn insert(&self, record: &NewMovieRecord) -> Result<Movie, MoviePersistenceError>;

    /// Fetch a movie without its showtimes.
    async fn find_by_title(&self, title: &MovieTitle)
    -> Result<Option<Movie>, MoviePersistenceError>;

    /// Fetch a movie with its showtimes ordered by start time.
    async fn find_with_showtimes(
        &self,
        title: &MovieTitle,
    ) -> Result<Option<MovieWithShowtimes>, MoviePersistenceError>;

    /// List every movie with its showtimes, ordered by title.
    async fn list_with_showtimes(&self) -> Result<Vec<MovieWithShowtimes>, MoviePersistenceError>;

    /// Apply column changes; `None` when the movie does not exist.
    async fn update(
        &self,
        id: &MovieId,
        changes: &MovieChanges,
    ) -> Result<Option<Movie>, MoviePersistenceError>;

    /// Delete a movie that has no showtimes; `None` when it does not exist.
    async fn delete(&self, id: &MovieId) -> Result<Option<Movie>, MoviePersistenceError>;

    /// Users holding a reservation on any showtime of the movie.
    async fn reservation_holders(&self, id: &MovieId)
    -> Result<Vec<UserId>, MoviePersistenceError>;
}
