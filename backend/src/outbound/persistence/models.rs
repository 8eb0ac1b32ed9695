//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions back into domain types
//! re-validate stored values and report a [`CorruptRow`] when a row no longer
//! satisfies the domain invariants.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Email, ExternalId, Location, MediaRef, Movie, MovieId, MovieTitle, PasswordHash, Reservation,
    ReservationDetails, ReservationId, Role, Showtime, ShowtimeId, StoredCredentials, User,
    UserId, Username,
};

use super::schema::{movies, reservations, showtimes, users};

/// A stored row that fails domain validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored {field} is invalid: {reason}")]
pub(crate) struct CorruptRow {
    field: &'static str,
    reason: String,
}

impl CorruptRow {
    fn new(field: &'static str, reason: impl ToString) -> Self {
        Self {
            field,
            reason: reason.to_string(),
        }
    }
}

fn non_negative(value: i32, field: &'static str) -> Result<u32, CorruptRow> {
    u32::try_from(value).map_err(|_| CorruptRow::new(field, format!("negative value {value}")))
}

/// Convert a domain count to the `INTEGER` column type, saturating.
pub(crate) fn db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) fn into_user(self) -> Result<User, CorruptRow> {
        Ok(User {
            id: UserId::from_uuid(self.id),
            email: Email::new(&self.email).map_err(|err| CorruptRow::new("email", err))?,
            username: self
                .username
                .map(Username::new)
                .transpose()
                .map_err(|err| CorruptRow::new("username", err))?,
            role: self
                .role
                .parse::<Role>()
                .map_err(|err| CorruptRow::new("role", err))?,
            external_id: self
                .external_id
                .map(ExternalId::new)
                .transpose()
                .map_err(|err| CorruptRow::new("external_id", err))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    pub(crate) fn into_credentials(self) -> Result<StoredCredentials, CorruptRow> {
        let password_hash = PasswordHash::new(self.password_hash.clone());
        Ok(StoredCredentials {
            user: self.into_user()?,
            password_hash,
        })
    }
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub username: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub external_id: Option<&'a str>,
}

/// Changeset struct for updating existing user records.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserUpdate<'a> {
    pub email: Option<&'a str>,
    pub username: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub role: Option<&'a str>,
    pub external_id: Option<&'a str>,
}

impl UserUpdate<'_> {
    pub(crate) fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
            && self.external_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

/// Row struct for reading from the movies table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = movies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MovieRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub genre: String,
    pub poster_url: String,
    pub poster_key: String,
    pub video_url: String,
    pub video_key: String,
    pub duration_seconds: i32,
    pub resolutions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MovieRow {
    pub(crate) fn into_movie(self) -> Result<Movie, CorruptRow> {
        Ok(Movie {
            id: MovieId::from_uuid(self.id),
            title: MovieTitle::new(&self.title).map_err(|err| CorruptRow::new("title", err))?,
            description: self.description,
            genre: self.genre,
            poster: MediaRef {
                url: self.poster_url,
                key: self.poster_key,
            },
            video: MediaRef {
                url: self.video_url,
                key: self.video_key,
            },
            duration_seconds: non_negative(self.duration_seconds, "duration_seconds")?,
            resolutions: self.resolutions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insertable struct for creating new movie records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = movies)]
pub(crate) struct NewMovieRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub genre: &'a str,
    pub poster_url: &'a str,
    pub poster_key: &'a str,
    pub video_url: &'a str,
    pub video_key: &'a str,
    pub duration_seconds: i32,
    pub resolutions: &'a [String],
}

/// Changeset struct for updating existing movie records.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = movies)]
pub(crate) struct MovieUpdate<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub genre: Option<&'a str>,
    pub poster_url: Option<&'a str>,
    pub poster_key: Option<&'a str>,
    pub video_url: Option<&'a str>,
    pub video_key: Option<&'a str>,
    pub duration_seconds: Option<i32>,
    pub resolutions: Option<&'a [String]>,
}

impl MovieUpdate<'_> {
    pub(crate) fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.genre.is_none()
            && self.poster_url.is_none()
            && self.video_url.is_none()
            && self.duration_seconds.is_none()
            && self.resolutions.is_none()
    }
}

// ---------------------------------------------------------------------------
// Showtimes
// ---------------------------------------------------------------------------

/// Row struct for reading from the showtimes table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = showtimes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ShowtimeRow {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub capacity: i32,
    pub total_capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShowtimeRow {
    pub(crate) fn into_showtime(self) -> Result<Showtime, CorruptRow> {
        Ok(Showtime {
            id: ShowtimeId::from_uuid(self.id),
            movie_id: MovieId::from_uuid(self.movie_id),
            start_time: self.start_time,
            end_time: self.end_time,
            location: Location::new(&self.location)
                .map_err(|err| CorruptRow::new("location", err))?,
            capacity: non_negative(self.capacity, "capacity")?,
            total_capacity: non_negative(self.total_capacity, "total_capacity")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insertable struct for scheduling a showtime.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = showtimes)]
pub(crate) struct NewShowtimeRow<'a> {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: &'a str,
    pub capacity: i32,
    pub total_capacity: i32,
}

/// Changeset for the descriptive showtime columns. Capacity columns are
/// always changed through conditional expressions instead.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = showtimes)]
pub(crate) struct ShowtimeUpdate<'a> {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<&'a str>,
}

impl ShowtimeUpdate<'_> {
    pub(crate) fn is_empty(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none() && self.location.is_none()
    }
}

// ---------------------------------------------------------------------------
// Reservations
// ---------------------------------------------------------------------------

/// Row struct for reading from the reservations table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reservations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReservationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub showtime_id: Uuid,
    pub seats_reserved: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReservationRow {
    pub(crate) fn into_reservation(self) -> Result<Reservation, CorruptRow> {
        Ok(Reservation {
            id: ReservationId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            showtime_id: ShowtimeId::from_uuid(self.showtime_id),
            seats_reserved: non_negative(self.seats_reserved, "seats_reserved")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insertable struct for creating reservations.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reservations)]
pub(crate) struct NewReservationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub showtime_id: Uuid,
    pub seats_reserved: i32,
}

/// Reservation joined with its showtime and movie.
pub(crate) type ReservationJoinRow = (ReservationRow, ShowtimeRow, MovieRow);

pub(crate) fn into_details(
    (reservation, showtime, movie): ReservationJoinRow,
) -> Result<ReservationDetails, CorruptRow> {
    Ok(ReservationDetails {
        reservation: reservation.into_reservation()?,
        showtime: showtime.into_showtime()?,
        movie: movie.into_movie()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn user_row(role: &str) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_owned(),
            username: Some("ada".to_owned()),
            password_hash: "salt$hash".to_owned(),
            role: role.to_owned(),
            external_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    fn user_row_converts_role() {
        let user = user_row("ADMIN").into_user().expect("valid row");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.username.map(|name| name.as_str().to_owned()), Some("ada".to_owned()));
    }

    #[rstest]
    fn unknown_role_is_reported_as_corrupt() {
        let err = user_row("OWNER").into_user().expect_err("bad role");
        assert!(err.to_string().starts_with("stored role is invalid"));
    }

    #[rstest]
    fn negative_capacity_is_reported_as_corrupt() {
        let row = ShowtimeRow {
            id: Uuid::new_v4(),
            movie_id: Uuid::new_v4(),
            start_time: Utc::now(),
            end_time: Utc::now() + chrono::Duration::hours(2),
            location: "Screen 1".to_owned(),
            capacity: -1,
            total_capacity: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let err = row.into_showtime().expect_err("negative capacity");
        assert_eq!(err.to_string(), "stored capacity is invalid: negative value -1");
    }

    #[rstest]
    #[case(0, 0)]
    #[case(42, 42)]
    #[case(u32::MAX, i32::MAX)]
    fn db_int_saturates(#[case] value: u32, #[case] expected: i32) {
        assert_eq!(db_int(value), expected);
    }
}
