//! Domain primitives, aggregates, and services.
//!
//! Purpose: define the strongly typed entities shared by the HTTP and
//! persistence layers, and the services that implement the driving ports.
//! Types document their invariants and serialisation contracts in Rustdoc.
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and stable identifier.
//! - User, Movie, Showtime, Reservation and their typed identifiers.
//! - Principal: authenticated caller handed to every service method.
//! - IdentityService, CatalogService, SchedulingService, ReservationService.

pub mod byte_range;
pub mod cache_aside;
pub mod catalog_service;
pub mod error;
pub mod identity_service;
pub mod ids;
pub mod movie;
pub mod ports;
pub mod reservation;
pub mod reservation_service;
pub mod scheduling_service;
pub mod showtime;
pub mod trace_id;
pub mod user;

#[cfg(test)]
pub(crate) mod service_test_support;

pub use self::byte_range::ByteRange;
pub use self::cache_aside::{CacheAside, CacheTtls};
pub use self::catalog_service::CatalogService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::identity_service::IdentityService;
pub use self::ids::{InvalidId, MovieId, ReservationId, ShowtimeId, UserId};
pub use self::movie::{
    MediaAsset, MediaKind, MediaRef, Movie, MovieDraft, MoviePatch, MovieTitle,
    MovieValidationError, MovieWithShowtimes, POSTER_CONTENT_TYPES, VIDEO_CONTENT_TYPES,
    require_media,
};
pub use self::reservation::{Reservation, ReservationDetails, ReservationOutcome, SeatCount};
pub use self::reservation_service::ReservationService;
pub use self::scheduling_service::SchedulingService;
pub use self::showtime::{
    Location, NewShowtime, Showtime, ShowtimePatch, ShowtimeValidationError, ShowtimeWithMovie,
    earliest,
};
pub use self::trace_id::TraceId;
pub use self::user::{
    Email, ExternalId, NewUser, Password, PasswordHash, Principal, Role, StoredCredentials, User,
    UserLookup, UserPatch, UserValidationError, Username,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use cinema::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
