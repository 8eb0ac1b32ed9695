//! In-process repositories backed by one mutex-guarded set of tables.
//!
//! [`MemoryDatabase`] implements every repository port so the cross-table
//! rules hold exactly as they do in PostgreSQL: each operation runs under a
//! single lock, which stands in for the transaction. It backs local runs
//! without a database and the integration tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use mockable::Clock;

use crate::domain::{
    Movie, MovieId, PasswordHash, Reservation, ReservationId, Showtime, ShowtimeId, User, UserId,
};

mod catalogue;
mod reservations;
mod users;


struct UserEntry {
    user: User,
    password_hash: PasswordHash,
    refresh_credential: Option<PasswordHash>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, UserEntry>,
    movies: BTreeMap<MovieId, Movie>,
    showtimes: BTreeMap<ShowtimeId, Showtime>,
    reservations: BTreeMap<ReservationId, Reservation>,
}

impl Tables {
    fn movie_title_taken(&self, title: &str, except: Option<MovieId>) -> bool {
        self.movies
            .values()
            .any(|movie| movie.title.as_str() == title && Some(movie.id) != except)
    }

    fn reservation_for(&self, user_id: &UserId, showtime_id: &ShowtimeId) -> Option<ReservationId> {
        self.reservations
            .values()
            .find(|r| &r.user_id == user_id && &r.showtime_id == showtime_id)
            .map(|r| r.id)
    }

    /// Distinct holders of reservations on any showtime of the movie.
    fn holders_of(&self, movie_id: &MovieId) -> Vec<UserId> {
        let mut holders: Vec<UserId> = self
            .reservations
            .values()
            .filter(|reservation| {
                self.showtimes
                    .get(&reservation.showtime_id)
                    .is_some_and(|showtime| &showtime.movie_id == movie_id)
            })
            .map(|reservation| reservation.user_id)
            .collect();
        holders.sort();
        holders.dedup();
        holders
    }

    /// The user's reservation for the movie, on its earliest showtime first.
    fn reservation_for_movie(&self, user_id: &UserId, movie_id: &MovieId) -> Option<&Reservation> {
        self.showtimes_of(movie_id)
            .iter()
            .find_map(|showtime| self.reservation_for(user_id, &showtime.id))
            .and_then(|id| self.reservations.get(&id))
    }

    fn showtimes_of(&self, movie_id: &MovieId) -> Vec<Showtime> {
        let mut showtimes: Vec<Showtime> = self
            .showtimes
            .values()
            .filter(|showtime| &showtime.movie_id == movie_id)
            .cloned()
            .collect();
        showtimes.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        showtimes
    }
}

/// Shared in-memory tables implementing the repository ports.
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
    clock: Arc<dyn Clock>,
}

impl MemoryDatabase {
    /// Create an empty database stamping rows with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            clock,
        }
    }

    /// Whether the account currently holds a refresh credential.
    pub fn has_refresh_credential(&self, id: &UserId) -> bool {
        self.tables()
            .users
            .get(id)
            .is_some_and(|entry| entry.refresh_credential.is_some())
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Every operation validates before it writes, so a poisoned lock still
        // guards consistent tables.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }
}
