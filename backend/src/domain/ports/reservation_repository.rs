//! Port abstraction for reservations and the seat counter they consume.
//!
//! Adapters own the capacity invariant: every method that changes
//! `seats_reserved` adjusts `Showtime::capacity` by the same amount inside one
//! atomic unit, and the check against the remaining capacity happens in that
//! same unit.
use async_trait::async_trait;

use crate::domain::{
    MovieId, Reservation, ReservationDetails, ReservationOutcome, SeatCount, ShowtimeId, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by reservation repository adapters.
    pub enum ReservationPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "reservation repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "reservation repository query failed: {message}",
        /// The user already holds a reservation for the showtime.
        Duplicate => "a reservation for this showtime already exists",
        /// The showtime vanished while the reservation was being written.
        ShowtimeMissing => "showtime no longer exists",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Take `seats` from the showtime and record the reservation.
    ///
    /// Returns `InsufficientCapacity` without writing anything when fewer
    /// seats remain.
    async fn reserve(
        &self,
        user_id: &UserId,
        showtime_id: &ShowtimeId,
        seats: SeatCount,
    ) -> Result<ReservationOutcome, ReservationPersistenceError>;

    /// The user's reservation on any showtime of the movie.
    ///
    /// A user holding seats for several showtimes of the movie gets the one on
    /// the earliest showtime.
    async fn find_for_movie(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
    ) -> Result<Option<Reservation>, ReservationPersistenceError>;

    /// Change the seat count of the user's reservation, moving the difference
    /// to or from the showtime. `None` when no reservation exists.
    async fn resize(
        &self,
        user_id: &UserId,
        showtime_id: &ShowtimeId,
        seats: SeatCount,
    ) -> Result<Option<ReservationOutcome>, ReservationPersistenceError>;

    /// Remove the user's reservation and return its seats to the showtime.
    async fn cancel(
        &self,
        user_id: &UserId,
        showtime_id: &ShowtimeId,
    ) -> Result<Option<Reservation>, ReservationPersistenceError>;

    /// One user's reservations, newest first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ReservationDetails>, ReservationPersistenceError>;

    /// Every reservation, newest first.
    async fn list_all(&self) -> Result<Vec<ReservationDetails>, ReservationPersistenceError>;
}
