//! `ReservationRepository` over the in-memory tables.

use async_trait::async_trait;

use crate::domain::ports::{ReservationPersistenceError, ReservationRepository};
use crate::domain::{
    MovieId, Reservation, ReservationDetails, ReservationId, ReservationOutcome, SeatCount,
    ShowtimeId, UserId,
};

use super::{MemoryDatabase, Tables};

fn details_where(
    tables: &Tables,
    keep: impl Fn(&Reservation) -> bool,
) -> Vec<ReservationDetails> {
    let mut listed: Vec<ReservationDetails> = tables
        .reservations
        .values()
        .filter(|reservation| keep(reservation))
        .filter_map(|reservation| {
            let showtime = tables.showtimes.get(&reservation.showtime_id)?;
            let movie = tables.movies.get(&showtime.movie_id)?;
            Some(ReservationDetails {
                reservation: reservation.clone(),
                showtime: showtime.clone(),
                movie: movie.clone(),
            })
        })
        .collect();
    listed.sort_by(|a, b| {
        b.reservation
            .created_at
            .cmp(&a.reservation.created_at)
            .then(a.reservation.id.cmp(&b.reservation.id))
    });
    listed
}

#[async_trait]
impl ReservationRepository for MemoryDatabase {
    async fn reserve(
        &self,
        user_id: &UserId,
        showtime_id: &ShowtimeId,
        seats: SeatCount,
    ) -> Result<ReservationOutcome, ReservationPersistenceError> {
        let now = self.now();
        let mut tables = self.tables();
        let requested = seats.get();
        let Some(available) = tables.showtimes.get(showtime_id).map(|s| s.capacity) else {
            return Err(ReservationPersistenceError::showtime_missing());
        };
        if available < requested {
            return Ok(ReservationOutcome::InsufficientCapacity {
                requested,
                available,
            });
        }
        if tables.reservation_for(user_id, showtime_id).is_some() {
            return Err(ReservationPersistenceError::duplicate());
        }

        if let Some(showtime) = tables.showtimes.get_mut(showtime_id) {
            showtime.capacity -= requested;
        }
        let reservation = Reservation {
            id: ReservationId::random(),
            user_id: *user_id,
            showtime_id: *showtime_id,
            seats_reserved: requested,
            created_at: now,
            updated_at: now,
        };
        tables.reservations.insert(reservation.id, reservation.clone());
        Ok(ReservationOutcome::Confirmed(reservation))
    }

    async fn find_for_movie(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
    ) -> Result<Option<Reservation>, ReservationPersistenceError> {
        Ok(self.tables().reservation_for_movie(user_id, movie_id).cloned())
    }

    async fn resize(
        &self,
        user_id: &UserId,
        showtime_id: &ShowtimeId,
        seats: SeatCount,
    ) -> Result<Option<ReservationOutcome>, ReservationPersistenceError> {
        let now = self.now();
        let mut tables = self.tables();
        let Some(reservation_id) = tables.reservation_for(user_id, showtime_id) else {
            return Ok(None);
        };
        let held = tables
            .reservations
            .get(&reservation_id)
            .map_or(0, |reservation| reservation.seats_reserved);
        let Some(showtime) = tables.showtimes.get_mut(showtime_id) else {
            return Err(ReservationPersistenceError::showtime_missing());
        };

        let wanted = seats.get();
        let available = showtime.capacity.saturating_add(held);
        if wanted > available {
            return Ok(Some(ReservationOutcome::InsufficientCapacity {
                requested: wanted,
                available,
            }));
        }
        showtime.capacity = available - wanted;

        let Some(reservation) = tables.reservations.get_mut(&reservation_id) else {
            return Ok(None);
        };
        reservation.seats_reserved = wanted;
        reservation.updated_at = now;
        Ok(Some(ReservationOutcome::Confirmed(reservation.clone())))
    }

    async fn cancel(
        &self,
        user_id: &UserId,
        showtime_id: &ShowtimeId,
    ) -> Result<Option<Reservation>, ReservationPersistenceError> {
        let mut tables = self.tables();
        let Some(removed) = tables
            .reservation_for(user_id, showtime_id)
            .and_then(|id| tables.reservations.remove(&id))
        else {
            return Ok(None);
        };
        if let Some(showtime) = tables.showtimes.get_mut(showtime_id) {
            showtime.capacity = showtime
                .capacity
                .saturating_add(removed.seats_reserved)
                .min(showtime.total_capacity);
        }
        Ok(Some(removed))
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ReservationDetails>, ReservationPersistenceError> {
        Ok(details_where(&self.tables(), |reservation| {
            &reservation.user_id == user_id
        }))
    }

    async fn list_all(&self) -> Result<Vec<ReservationDetails>, ReservationPersistenceError> {
        Ok(details_where(&self.tables(), |_| true))
    }
}
