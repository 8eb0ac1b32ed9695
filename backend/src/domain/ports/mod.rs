//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, cache, media, hashing) are implemented by the
//! outbound adapters. Driving ports (`UserAccounts`, `MovieCatalog`,
//! `ShowtimeScheduling`, `SeatReservations`) are implemented by the domain
//! services and consumed by the HTTP adapter.

mod macros;
pub(crate) use macros::define_port_error;

mod cache_key;
mod cache_store;
mod media_store;
mod movie_catalog;
mod movie_repository;
mod password_hasher;
mod reservation_repository;
mod seat_reservations;
mod showtime_repository;
mod showtime_scheduling;
mod user_accounts;
mod user_repository;
mod video_probe;

pub use cache_key::CacheKey;
#[cfg(test)]
pub use cache_store::MockCacheStore;
pub use cache_store::{CacheStore, CacheStoreError, FixtureCacheStore};
#[cfg(test)]
pub use media_store::MockMediaStore;
pub use media_store::{MediaChunks, MediaStore, MediaStoreError};
#[cfg(test)]
pub use movie_catalog::MockMovieCatalog;
pub use movie_catalog::{MovieCatalog, MovieStream, STREAM_CONTENT_TYPE};
#[cfg(test)]
pub use movie_repository::MockMovieRepository;
pub use movie_repository::{MovieChanges, MoviePersistenceError, MovieRepository, NewMovieRecord};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHasher, PasswordHasherError};
#[cfg(test)]
pub use reservation_repository::MockReservationRepository;
pub use reservation_repository::{ReservationPersistenceError, ReservationRepository};
#[cfg(test)]
pub use seat_reservations::MockSeatReservations;
pub use seat_reservations::SeatReservations;
#[cfg(test)]
pub use showtime_repository::MockShowtimeRepository;
pub use showtime_repository::{
    DeletedShowtime, ShowtimeChanges, ShowtimePersistenceError, ShowtimeRepository,
};
#[cfg(test)]
pub use showtime_scheduling::MockShowtimeScheduling;
pub use showtime_scheduling::ShowtimeScheduling;
#[cfg(test)]
pub use user_accounts::MockUserAccounts;
pub use user_accounts::UserAccounts;
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{
    DeletedUser, NewUserRecord, UserChanges, UserPersistenceError, UserRepository,
};
#[cfg(test)]
pub use video_probe::MockVideoProbe;
pub use video_probe::{DeclaredVideoProbe, VideoMetadata, VideoProbe};
