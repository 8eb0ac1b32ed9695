//! Showtime scheduling service.
//!
//! Showtimes are addressed through the title of the movie they screen. When a
//! movie has several, the caller may pick one by start time; otherwise the
//! earliest is used.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::catalog_service::{holder_keys, map_movie_error};
use crate::domain::ports::{
    CacheKey, MovieRepository, ShowtimeChanges, ShowtimePersistenceError, ShowtimeRepository,
    ShowtimeScheduling,
};
use crate::domain::{
    CacheAside, CacheTtls, Error, Movie, MovieTitle, NewShowtime, Principal, Showtime,
    ShowtimePatch, ShowtimeWithMovie, earliest,
};

/// Scheduling service implementing [`ShowtimeScheduling`].
#[derive(Clone)]
pub struct SchedulingService<M, T> {
    movies: Arc<M>,
    showtimes: Arc<T>,
    cache: CacheAside,
    ttl: Duration,
}

impl<M, T> SchedulingService<M, T> {
    /// Create a service over the movie and showtime repositories.
    pub fn new(movies: Arc<M>, showtimes: Arc<T>, cache: CacheAside, ttls: &CacheTtls) -> Self {
        Self {
            movies,
            showtimes,
            cache,
            ttl: ttls.showtimes,
        }
    }
}

pub(crate) fn map_showtime_error(error: ShowtimePersistenceError) -> Error {
    match error {
        ShowtimePersistenceError::Connection { message } => {
            Error::service_unavailable(format!("showtime repository unavailable: {message}"))
        }
        ShowtimePersistenceError::Query { message } => {
            Error::internal(format!("showtime repository error: {message}"))
        }
        error @ ShowtimePersistenceError::CapacityBelowReserved { .. } => {
            Error::invalid_request(error.to_string())
        }
    }
}

fn showtime_not_found() -> Error {
    Error::not_found("showtime not found")
}

/// Pick the showtime starting at `start_time`, or the earliest.
fn select(showtimes: &[Showtime], start_time: Option<DateTime<Utc>>) -> Option<&Showtime> {
    match start_time {
        Some(start) => showtimes.iter().find(|showtime| showtime.start_time == start),
        None => earliest(showtimes),
    }
}

fn patch_is_empty(patch: &ShowtimePatch) -> bool {
    patch.start_time.is_none()
        && patch.end_time.is_none()
        && patch.location.is_none()
        && patch.total_capacity.is_none()
}

impl<M, T> SchedulingService<M, T>
where
    M: MovieRepository,
    T: ShowtimeRepository,
{
    async fn movie(&self, title: &MovieTitle) -> Result<Option<Movie>, Error> {
        self.movies
            .find_by_title(title)
            .await
            .map_err(map_movie_error)
    }

    async fn require_movie(&self, title: &MovieTitle) -> Result<Movie, Error> {
        self.movie(title)
            .await?
            .ok_or_else(|| Error::not_found("movie not found"))
    }

    async fn schedule_of(&self, movie: &Movie) -> Result<Vec<Showtime>, Error> {
        self.showtimes
            .list_for_movie(&movie.id)
            .await
            .map_err(map_showtime_error)
    }

    async fn locate(
        &self,
        title: &MovieTitle,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Showtime, Error> {
        let movie = self.require_movie(title).await?;
        let schedule = self.schedule_of(&movie).await?;
        select(&schedule, start_time)
            .cloned()
            .ok_or_else(showtime_not_found)
    }

    async fn load_selected(&self, title: &MovieTitle) -> Result<Option<ShowtimeWithMovie>, Error> {
        let Some(movie) = self.movie(title).await? else {
            return Ok(None);
        };
        let schedule = self.schedule_of(&movie).await?;
        Ok(earliest(&schedule).cloned().map(|showtime| ShowtimeWithMovie {
            showtime,
            movie,
        }))
    }
}

#[async_trait]
impl<M, T> ShowtimeScheduling for SchedulingService<M, T>
where
    M: MovieRepository,
    T: ShowtimeRepository,
{
    async fn create_showtime(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        showtime: NewShowtime,
    ) -> Result<Showtime, Error> {
        principal.require_admin()?;
        let movie = self.require_movie(title).await?;
        let created = self
            .showtimes
            .insert(&movie.id, &showtime)
            .await
            .map_err(map_showtime_error)?;
        self.cache.invalidate(CacheKey::for_movie(title)).await;
        info!(
            showtime_id = %created.id,
            title = %title,
            capacity = created.total_capacity,
            "showtime scheduled"
        );
        Ok(created)
    }

    async fn find_showtime(&self, title: &MovieTitle) -> Result<ShowtimeWithMovie, Error> {
        self.cache
            .get_or_load(&CacheKey::Showtime(title.clone()), self.ttl, || {
                self.load_selected(title)
            })
            .await?
            .ok_or_else(showtime_not_found)
    }

    async fn list_showtimes(&self) -> Result<Vec<ShowtimeWithMovie>, Error> {
        let showtimes = self
            .cache
            .get_or_load(&CacheKey::AllShowtimes, self.ttl, || async {
                self.showtimes
                    .list_with_movies()
                    .await
                    .map(Some)
                    .map_err(map_showtime_error)
            })
            .await?;
        Ok(showtimes.unwrap_or_default())
    }

    async fn update_showtime(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        patch: ShowtimePatch,
    ) -> Result<Showtime, Error> {
        principal.require_admin()?;
        if patch_is_empty(&patch) {
            return Err(Error::invalid_request("no changes supplied"));
        }
        let current = self.locate(title, patch.match_start_time).await?;
        patch.validate_against(&current)?;
        if let Some(total) = patch.total_capacity {
            let reserved = current.reserved_seats();
            if total < reserved {
                return Err(map_showtime_error(
                    ShowtimePersistenceError::capacity_below_reserved(reserved),
                ));
            }
        }

        let changes = ShowtimeChanges {
            start_time: patch.start_time,
            end_time: patch.end_time,
            location: patch.location,
            total_capacity: patch.total_capacity,
        };
        let updated = self
            .showtimes
            .update(&current.id, &changes)
            .await
            .map_err(map_showtime_error)?
            .ok_or_else(showtime_not_found)?;

        let mut keys = CacheKey::for_movie(title).to_vec();
        keys.extend(holder_keys(self.movies.as_ref(), &updated.movie_id).await);
        self.cache.invalidate(keys).await;
        info!(showtime_id = %updated.id, title = %title, "showtime updated");
        Ok(updated)
    }

    async fn delete_showtime(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Showtime, Error> {
        principal.require_admin()?;
        let current = self.locate(title, start_time).await?;
        let deleted = self
            .showtimes
            .delete(&current.id)
            .await
            .map_err(map_showtime_error)?
            .ok_or_else(showtime_not_found)?;

        let mut keys = CacheKey::for_movie(title).to_vec();
        keys.push(CacheKey::AllReservations);
        keys.extend(
            deleted
                .affected_users
                .iter()
                .map(|user| CacheKey::UserReservations(*user)),
        );
        self.cache.invalidate(keys).await;
        info!(
            showtime_id = %deleted.showtime.id,
            title = %title,
            cancelled_reservations = deleted.affected_users.len(),
            "showtime deleted"
        );
        Ok(deleted.showtime)
    }
}

#[cfg(test)]
#[path = "scheduling_service_tests.rs"]
mod tests;
