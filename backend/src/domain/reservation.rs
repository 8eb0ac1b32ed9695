//! Seat reservations and the outcome of capacity checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, Movie, ReservationId, Showtime, ShowtimeId, UserId};

/// A user's hold on seats for one showtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: ReservationId,
    pub user_id: UserId,
    pub showtime_id: ShowtimeId,
    pub seats_reserved: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reservation joined with its showtime and movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub showtime: Showtime,
    pub movie: Movie,
}

/// Number of seats requested by a caller. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeatCount(u32);

impl SeatCount {
    /// Validate a requested seat count.
    pub fn new(raw: i64) -> Result<Self, Error> {
        match u32::try_from(raw) {
            Ok(value) if value >= 1 && i32::try_from(value).is_ok() => Ok(Self(value)),
            _ => Err(Error::invalid_request("seats must be a positive integer")),
        }
    }

    /// Numeric value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Result of an operation that consumes seats.
///
/// Running out of seats is an expected business outcome, so it is reported as
/// a value rather than an [`Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// The reservation was written and capacity adjusted.
    Confirmed(Reservation),
    /// The showtime does not have enough unreserved seats; nothing changed.
    InsufficientCapacity { requested: u32, available: u32 },
}

impl ReservationOutcome {
    /// The confirmed reservation, if any.
    pub fn confirmed(self) -> Option<Reservation> {
        match self {
            Self::Confirmed(reservation) => Some(reservation),
            Self::InsufficientCapacity { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(i64::from(i32::MAX) + 1)]
    fn seat_count_rejects_non_positive(#[case] raw: i64) {
        let err = SeatCount::new(raw).expect_err("invalid seats");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn seat_count_accepts_positive() {
        assert_eq!(SeatCount::new(4).map(SeatCount::get).ok(), Some(4));
    }

    #[rstest]
    fn insufficient_capacity_has_no_reservation() {
        let outcome = ReservationOutcome::InsufficientCapacity {
            requested: 5,
            available: 2,
        };
        assert!(outcome.confirmed().is_none());
    }
}
