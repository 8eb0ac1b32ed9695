//! Port abstraction for showtime persistence.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Location, MovieId, NewShowtime, Showtime, ShowtimeId, ShowtimeWithMovie, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by showtime repository adapters.
    pub enum ShowtimePersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "showtime repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "showtime repository query failed: {message}",
        /// A resize would leave fewer seats than are already reserved.
        CapacityBelowReserved { reserved: u32 } => "capacity cannot drop below the {reserved} seats already reserved",
    }
}

/// Column changes for a showtime. A new `total_capacity` shifts the live
/// capacity by the same delta.
#[derive(Debug, Clone, Default)]
pub struct ShowtimeChanges {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub total_capacity: Option<u32>,
}

/// Result of removing a showtime together with its reservations.
#[derive(Debug, Clone)]
pub struct DeletedShowtime {
    pub showtime: Showtime,
    /// Users whose reservations were removed with the showtime.
    pub affected_users: Vec<UserId>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShowtimeRepository: Send + Sync {
    /// Insert a showtime with `capacity == total_capacity`.
    async fn insert(
        &self,
        movie_id: &MovieId,
        showtime: &NewShowtime,
    ) -> Result<Showtime, ShowtimePersistenceError>;

    /// Showtimes of one movie ordered by start time.
    async fn list_for_movie(
        &self,
        movie_id: &MovieId,
    ) -> Result<Vec<Showtime>, ShowtimePersistenceError>;

    /// Every showtime with its movie ordered by start time.
    async fn list_with_movies(&self) -> Result<Vec<ShowtimeWithMovie>, ShowtimePersistenceError>;

    /// Apply column changes atomically; `None` when the showtime does not exist.
    async fn update(
        &self,
        id: &ShowtimeId,
        changes: &ShowtimeChanges,
    ) -> Result<Option<Showtime>, ShowtimePersistenceError>;

    /// Delete a showtime and its reservations; `None` when it does not exist.
    async fn delete(&self, id: &ShowtimeId)
    -> Result<Option<DeletedShowtime>, ShowtimePersistenceError>;
}
