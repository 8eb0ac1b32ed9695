//! Seat reservation service.
//!
//! `Showtime::capacity` is the live count of free seats. This service checks a
//! request against the last known count to answer early, but the authoritative
//! check happens again inside the repository's atomic unit, which is what keeps
//! concurrent reservations from overselling a showtime.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::catalog_service::{holder_keys, map_movie_error};
use crate::domain::ports::{
    CacheKey, MovieRepository, ReservationPersistenceError, ReservationRepository,
    SeatReservations, ShowtimeRepository,
};
use crate::domain::scheduling_service::map_showtime_error;
use crate::domain::{
    CacheAside, CacheTtls, Error, Movie, MovieTitle, Principal, Reservation, ReservationDetails,
    ReservationOutcome, SeatCount, Showtime, earliest,
};

/// Reservation service implementing [`SeatReservations`].
#[derive(Clone)]
pub struct ReservationService<M, T, R> {
    movies: Arc<M>,
    showtimes: Arc<T>,
    reservations: Arc<R>,
    cache: CacheAside,
    ttl: Duration,
}

impl<M, T, R> ReservationService<M, T, R> {
    /// Create a service over the catalogue, schedule, and reservation stores.
    pub fn new(
        movies: Arc<M>,
        showtimes: Arc<T>,
        reservations: Arc<R>,
        cache: CacheAside,
        ttls: &CacheTtls,
    ) -> Self {
        Self {
            movies,
            showtimes,
            reservations,
            cache,
            ttl: ttls.reservations,
        }
    }
}

fn map_reservation_error(error: ReservationPersistenceError) -> Error {
    match error {
        ReservationPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("reservation repository unavailable: {message}"))
        }
        ReservationPersistenceError::Query { message } => {
            Error::internal(format!("reservation repository error: {message}"))
        }
        error @ ReservationPersistenceError::Duplicate => {
            Error::conflict(error.to_string()).with_details(json!({ "code": "duplicate" }))
        }
        ReservationPersistenceError::ShowtimeMissing => showtime_not_found(),
    }
}

fn showtime_not_found() -> Error {
    Error::not_found("showtime not found")
}

fn reservation_not_found() -> Error {
    Error::not_found("reservation not found")
}

impl<M, T, R> ReservationService<M, T, R>
where
    M: MovieRepository,
    T: ShowtimeRepository,
    R: ReservationRepository,
{
    async fn movie(&self, title: &MovieTitle) -> Result<Movie, Error> {
        self.movies
            .find_by_title(title)
            .await
            .map_err(map_movie_error)?
            .ok_or_else(|| Error::not_found("movie not found"))
    }

    async fn schedule(&self, movie: &Movie) -> Result<Vec<Showtime>, Error> {
        self.showtimes
            .list_for_movie(&movie.id)
            .await
            .map_err(map_showtime_error)
    }

    /// The principal's reservation for the movie, whichever showtime it is on.
    async fn held(&self, principal: &Principal, movie: &Movie) -> Result<Reservation, Error> {
        self.reservations
            .find_for_movie(&principal.user_id, &movie.id)
            .await
            .map_err(map_reservation_error)?
            .ok_or_else(reservation_not_found)
    }

    /// Drop every read model that embeds the seat count of `movie`'s showtimes.
    async fn invalidate(&self, principal: &Principal, movie: &Movie) {
        let mut keys = CacheKey::for_reservation(principal.user_id, &movie.title);
        keys.extend(holder_keys(self.movies.as_ref(), &movie.id).await);
        self.cache.invalidate(keys).await;
    }

    async fn settle(
        &self,
        principal: &Principal,
        movie: &Movie,
        outcome: ReservationOutcome,
        action: &'static str,
    ) -> ReservationOutcome {
        let title = &movie.title;
        match &outcome {
            ReservationOutcome::Confirmed(reservation) => {
                self.invalidate(principal, movie).await;
                info!(
                    reservation_id = %reservation.id,
                    user_id = %principal.user_id,
                    title = %title,
                    seats = reservation.seats_reserved,
                    action,
                    "reservation confirmed"
                );
            }
            ReservationOutcome::InsufficientCapacity {
                requested,
                available,
            } => {
                info!(
                    user_id = %principal.user_id,
                    title = %title,
                    requested,
                    available,
                    action,
                    "reservation refused: not enough seats"
                );
            }
        }
        outcome
    }
}

#[async_trait]
impl<M, T, R> SeatReservations for ReservationService<M, T, R>
where
    M: MovieRepository,
    T: ShowtimeRepository,
    R: ReservationRepository,
{
    async fn create_reservation(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        seats: i64,
    ) -> Result<ReservationOutcome, Error> {
        let seats = SeatCount::new(seats)?;
        let movie = self.movie(title).await?;
        let schedule = self.schedule(&movie).await?;
        let showtime = earliest(&schedule).ok_or_else(showtime_not_found)?;
        if seats.get() > showtime.capacity {
            let outcome = ReservationOutcome::InsufficientCapacity {
                requested: seats.get(),
                available: showtime.capacity,
            };
            return Ok(self.settle(principal, &movie, outcome, "create").await);
        }

        let outcome = self
            .reservations
            .reserve(&principal.user_id, &showtime.id, seats)
            .await
            .map_err(map_reservation_error)?;
        Ok(self.settle(principal, &movie, outcome, "create").await)
    }

    async fn find_my_reservations(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ReservationDetails>, Error> {
        let user_id = principal.user_id;
        let reservations = self
            .cache
            .get_or_load(&CacheKey::UserReservations(user_id), self.ttl, || async move {
                self.reservations
                    .list_for_user(&user_id)
                    .await
                    .map(Some)
                    .map_err(map_reservation_error)
            })
            .await?;
        Ok(reservations.unwrap_or_default())
    }

    async fn list_all_reservations(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ReservationDetails>, Error> {
        principal.require_admin()?;
        let reservations = self
            .cache
            .get_or_load(&CacheKey::AllReservations, self.ttl, || async {
                self.reservations
                    .list_all()
                    .await
                    .map(Some)
                    .map_err(map_reservation_error)
            })
            .await?;
        Ok(reservations.unwrap_or_default())
    }

    async fn update_reservation(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        seats: i64,
    ) -> Result<ReservationOutcome, Error> {
        let seats = SeatCount::new(seats)?;
        let movie = self.movie(title).await?;
        let existing = self.held(principal, &movie).await?;
        let showtime = self
            .schedule(&movie)
            .await?
            .into_iter()
            .find(|showtime| showtime.id == existing.showtime_id)
            .ok_or_else(showtime_not_found)?;

        let extra = seats.get().saturating_sub(existing.seats_reserved);
        if extra > showtime.capacity {
            let outcome = ReservationOutcome::InsufficientCapacity {
                requested: seats.get(),
                available: showtime.capacity + existing.seats_reserved,
            };
            return Ok(self.settle(principal, &movie, outcome, "update").await);
        }

        let outcome = self
            .reservations
            .resize(&principal.user_id, &showtime.id, seats)
            .await
            .map_err(map_reservation_error)?
            .ok_or_else(reservation_not_found)?;
        Ok(self.settle(principal, &movie, outcome, "update").await)
    }

    async fn cancel_reservation(
        &self,
        principal: &Principal,
        title: &MovieTitle,
    ) -> Result<Reservation, Error> {
        let movie = self.movie(title).await?;
        let existing = self.held(principal, &movie).await?;
        let cancelled = self
            .reservations
            .cancel(&principal.user_id, &existing.showtime_id)
            .await
            .map_err(map_reservation_error)?
            .ok_or_else(reservation_not_found)?;

        self.invalidate(principal, &movie).await;
        info!(
            reservation_id = %cancelled.id,
            user_id = %principal.user_id,
            title = %title,
            released = cancelled.seats_reserved,
            "reservation cancelled"
        );
        Ok(cancelled)
    }
}

#[cfg(test)]
#[path = "reservation_service_tests.rs"]
mod tests;
