//! Typed cache keys shared by the services and cache adapters.
//!
//! Every cached read model has exactly one key variant, so the set of keys a
//! mutation must invalidate can be written down next to the mutation.

use std::fmt;

use crate::domain::{MovieTitle, UserId, UserLookup};

/// Key under which a read model is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `movie:<title>`: one movie with its showtimes.
    Movie(MovieTitle),
    /// `movies:all`: every movie with its showtimes.
    AllMovies,
    /// `showtime:<title>`: the selected showtime of a movie.
    Showtime(MovieTitle),
    /// `showtimes:all`: every showtime with its movie.
    AllShowtimes,
    /// `user:<lookup>`: one account, per lookup form.
    User(UserLookup),
    /// `users:all`: every account.
    AllUsers,
    /// `reservations:user:<id>`: one user's reservations.
    UserReservations(UserId),
    /// `reservations:all`: every reservation.
    AllReservations,
}

impl CacheKey {
    /// Keys describing a movie and anything that embeds it.
    pub fn for_movie(title: &MovieTitle) -> [Self; 4] {
        [
            Self::Movie(title.clone()),
            Self::AllMovies,
            Self::Showtime(title.clone()),
            Self::AllShowtimes,
        ]
    }

    /// Keys touched when a reservation for `title` held by `user_id` changes.
    ///
    /// Seat counts are embedded in the showtime and movie read models, so
    /// those are included alongside the reservation lists.
    pub fn for_reservation(user_id: UserId, title: &MovieTitle) -> Vec<Self> {
        let mut keys = vec![Self::UserReservations(user_id), Self::AllReservations];
        keys.extend(Self::for_movie(title));
        keys
    }

    /// Reservation lists of every listed holder plus `reservations:all`.
    ///
    /// Reservation read models embed the showtime and movie, so any change to
    /// either must reach the lists of everyone holding seats for it.
    pub fn for_holders(holders: &[UserId]) -> Vec<Self> {
        let mut keys = vec![Self::AllReservations];
        keys.extend(holders.iter().map(|id| Self::UserReservations(*id)));
        keys
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie(title) => write!(f, "movie:{title}"),
            Self::AllMovies => f.write_str("movies:all"),
            Self::Showtime(title) => write!(f, "showtime:{title}"),
            Self::AllShowtimes => f.write_str("showtimes:all"),
            Self::User(lookup) => write!(f, "user:{lookup}"),
            Self::AllUsers => f.write_str("users:all"),
            Self::UserReservations(id) => write!(f, "reservations:user:{id}"),
            Self::AllReservations => f.write_str("reservations:all"),
        }
    }
}
