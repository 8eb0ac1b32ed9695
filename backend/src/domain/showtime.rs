//! Scheduled screenings and their seat capacity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, Movie, MovieId, ShowtimeId};

const LOCATION_MAX: usize = 255;

/// Validation errors for scheduling input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShowtimeValidationError {
    #[error("capacity must be at least 1")]
    CapacityTooSmall,
    #[error("end time must be after start time")]
    EndBeforeStart,
    #[error("location must not be empty")]
    EmptyLocation,
    #[error("location must be at most {max} characters")]
    LocationTooLong { max: usize },
}

impl From<ShowtimeValidationError> for Error {
    fn from(value: ShowtimeValidationError) -> Self {
        Error::invalid_request(value.to_string())
    }
}

/// Screening venue label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "Screen 1")]
pub struct Location(String);

impl Location {
    /// Validate a venue label.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ShowtimeValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ShowtimeValidationError::EmptyLocation);
        }
        if trimmed.chars().count() > LOCATION_MAX {
            return Err(ShowtimeValidationError::LocationTooLong { max: LOCATION_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the label.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Location {
    type Error = ShowtimeValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.0
    }
}

/// A screening of one movie.
///
/// `capacity` is the live count of unreserved seats; `total_capacity` is the
/// configured size of the screening. `0 <= capacity <= total_capacity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    pub id: ShowtimeId,
    pub movie_id: MovieId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Location,
    pub capacity: u32,
    pub total_capacity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Showtime {
    /// Seats currently held by reservations.
    pub const fn reserved_seats(&self) -> u32 {
        self.total_capacity.saturating_sub(self.capacity)
    }
}

/// A showtime together with the movie it screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeWithMovie {
    #[serde(flatten)]
    pub showtime: Showtime,
    pub movie: Movie,
}

fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ShowtimeValidationError> {
    if end <= start {
        return Err(ShowtimeValidationError::EndBeforeStart);
    }
    Ok(())
}

/// Validated request to schedule a screening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShowtime {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Location,
    pub capacity: u32,
}

impl NewShowtime {
    /// Validate raw input; `capacity` arrives signed from clients.
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        location: &str,
        capacity: i64,
    ) -> Result<Self, ShowtimeValidationError> {
        let capacity = positive_capacity(capacity)?;
        check_window(start_time, end_time)?;
        Ok(Self {
            start_time,
            end_time,
            location: Location::new(location)?,
            capacity,
        })
    }
}

fn positive_capacity(raw: i64) -> Result<u32, ShowtimeValidationError> {
    match u32::try_from(raw) {
        Ok(value) if value >= 1 && i32::try_from(value).is_ok() => Ok(value),
        _ => Err(ShowtimeValidationError::CapacityTooSmall),
    }
}

/// Partial update for a screening.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowtimePatch {
    /// Selects which of the movie's showtimes to update; the earliest when unset.
    pub match_start_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub total_capacity: Option<u32>,
}

impl ShowtimePatch {
    /// Validate raw optional input.
    pub fn new(
        match_start_time: Option<DateTime<Utc>>,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        location: Option<&str>,
        total_capacity: Option<i64>,
    ) -> Result<Self, ShowtimeValidationError> {
        if let (Some(start), Some(end)) = (start_time, end_time) {
            check_window(start, end)?;
        }
        Ok(Self {
            match_start_time,
            start_time,
            end_time,
            location: location.map(Location::new).transpose()?,
            total_capacity: total_capacity.map(positive_capacity).transpose()?,
        })
    }

    /// Check the window produced by applying this patch to `current`.
    pub fn validate_against(&self, current: &Showtime) -> Result<(), ShowtimeValidationError> {
        check_window(
            self.start_time.unwrap_or(current.start_time),
            self.end_time.unwrap_or(current.end_time),
        )
    }
}

/// Pick the showtime with the earliest start time.
pub fn earliest(showtimes: &[Showtime]) -> Option<&Showtime> {
    showtimes
        .iter()
        .min_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 19, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn showtime_at(start: DateTime<Utc>) -> Showtime {
        Showtime {
            id: ShowtimeId::random(),
            movie_id: MovieId::random(),
            start_time: start,
            end_time: start + Duration::hours(2),
            location: Location::new("Screen 1").expect("valid"),
            capacity: 10,
            total_capacity: 10,
            created_at: start,
            updated_at: start,
        }
    }

    #[rstest]
    #[case(0)]
    #[case(-4)]
    #[case(i64::from(u32::MAX))]
    fn new_rejects_bad_capacity(start: DateTime<Utc>, #[case] capacity: i64) {
        let err = NewShowtime::new(start, start + Duration::hours(2), "Screen 1", capacity)
            .expect_err("invalid capacity");
        assert_eq!(err, ShowtimeValidationError::CapacityTooSmall);
    }

    #[rstest]
    fn new_rejects_inverted_window(start: DateTime<Utc>) {
        let err = NewShowtime::new(start, start, "Screen 1", 5).expect_err("empty window");
        assert_eq!(err, ShowtimeValidationError::EndBeforeStart);
    }

    #[rstest]
    fn new_rejects_blank_location(start: DateTime<Utc>) {
        let err = NewShowtime::new(start, start + Duration::hours(1), "  ", 5)
            .expect_err("blank location");
        assert_eq!(err, ShowtimeValidationError::EmptyLocation);
    }

    #[rstest]
    fn patch_is_checked_against_current_window(start: DateTime<Utc>) {
        let current = showtime_at(start);
        let patch = ShowtimePatch {
            end_time: Some(start - Duration::minutes(5)),
            ..ShowtimePatch::default()
        };
        assert_eq!(
            patch.validate_against(&current),
            Err(ShowtimeValidationError::EndBeforeStart)
        );
    }

    #[rstest]
    fn earliest_picks_first_start(start: DateTime<Utc>) {
        let later = showtime_at(start + Duration::days(1));
        let first = showtime_at(start);
        let list = vec![later, first.clone()];
        assert_eq!(earliest(&list), Some(&first));
        assert!(earliest(&[]).is_none());
    }

    #[rstest]
    fn reserved_seats_is_total_minus_remaining(start: DateTime<Utc>) {
        let mut showtime = showtime_at(start);
        showtime.capacity = 3;
        assert_eq!(showtime.reserved_seats(), 7);
    }
}
