//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Each repository implements one driven port from
//! [`crate::domain::ports`] over a shared `bb8` pool of `diesel-async`
//! connections. Row structs and table definitions stay private to this
//! module; repositories convert rows into validated domain values on the way
//! out and report rows that fail validation as query errors.
//!
//! Seat accounting lives entirely in SQL: every statement that changes
//! `reservations.seats_reserved` moves `showtimes.capacity` by the same amount
//! inside the same transaction.
//!
//! # Example
//!
//! ```no_run
//! use cinema::outbound::persistence::{
//!     DbPool, DieselReservationRepository, PoolConfig, run_pending_migrations,
//! };
//!
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! let url = "postgres://localhost/cinema";
//! run_pending_migrations(url).await?;
//! let pool = DbPool::new(PoolConfig::new(url)).await?;
//! let reservations = DieselReservationRepository::new(pool);
//! # let _ = reservations;
//! # Ok(())
//! # }
//! ```

mod diesel_helpers;
mod diesel_movie_repository;
mod diesel_reservation_repository;
mod diesel_showtime_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_movie_repository::DieselMovieRepository;
pub use diesel_reservation_repository::DieselReservationRepository;
pub use diesel_showtime_repository::DieselShowtimeRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
