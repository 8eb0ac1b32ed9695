//! PostgreSQL-backed `ReservationRepository` implementation using Diesel ORM.
//!
//! Seats are taken with a conditional decrement
//! (`capacity = capacity - n WHERE capacity >= n`) inside the same
//! transaction that writes the reservation row. The row lock taken by that
//! `UPDATE` serialises concurrent bookings for one showtime, so the counter can
//! never go negative and two bookings can never both claim the last seat.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{ReservationPersistenceError, ReservationRepository};
use crate::domain::{
    MovieId, Reservation, ReservationDetails, ReservationOutcome, SeatCount, ShowtimeId, UserId,
};

use super::diesel_helpers::{
    DieselFailure, classify_diesel_error, collect_rows, corrupt_row_message, pool_error_message,
    unrecognised_violation,
};
use super::models::{
    MovieRow, NewReservationRow, ReservationJoinRow, ReservationRow, ShowtimeRow, db_int,
    into_details,
};
use super::pool::{DbPool, PoolError};
use super::schema::{movies, reservations, showtimes};

/// Diesel-backed implementation of the `ReservationRepository` port.
#[derive(Clone)]
pub struct DieselReservationRepository {
    pool: DbPool,
}

impl DieselReservationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Outcome of a seat-consuming transaction.
enum Booking {
    Written(ReservationRow),
    /// Fewer seats than requested were free; carries what was available.
    Short(i32),
    ShowtimeMissing,
    NotHeld,
}

fn map_pool_error(error: PoolError) -> ReservationPersistenceError {
    ReservationPersistenceError::connection(pool_error_message(error))
}

/// Map Diesel errors to domain reservation persistence errors.
fn map_diesel_error(error: diesel::result::Error) -> ReservationPersistenceError {
    match classify_diesel_error(error) {
        DieselFailure::Connection(message) => ReservationPersistenceError::connection(message),
        DieselFailure::Query(message) => ReservationPersistenceError::query(message),
        failure @ DieselFailure::UniqueViolation(_)
            if failure.names("reservations_user_showtime_key") =>
        {
            ReservationPersistenceError::duplicate()
        }
        failure @ DieselFailure::ForeignKeyViolation(_)
            if failure.names("reservations_showtime_id_fkey") =>
        {
            ReservationPersistenceError::showtime_missing()
        }
        other => ReservationPersistenceError::query(unrecognised_violation(&other)),
    }
}

fn to_reservation(row: ReservationRow) -> Result<Reservation, ReservationPersistenceError> {
    row.into_reservation()
        .map_err(|err| ReservationPersistenceError::query(corrupt_row_message(err)))
}

fn seat_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

/// Convert a finished booking into the port's outcome.
fn settle(
    booking: Booking,
    requested: SeatCount,
) -> Result<Option<ReservationOutcome>, ReservationPersistenceError> {
    match booking {
        Booking::Written(row) => Ok(Some(ReservationOutcome::Confirmed(to_reservation(row)?))),
        Booking::Short(available) => Ok(Some(ReservationOutcome::InsufficientCapacity {
            requested: requested.get(),
            available: seat_count(available),
        })),
        Booking::ShowtimeMissing => Err(ReservationPersistenceError::showtime_missing()),
        Booking::NotHeld => Ok(None),
    }
}

/// Take `seats` from a showtime if that many are free.
///
/// Returns `None` on success, otherwise the booking that explains the
/// refusal.
async fn take_seats<C>(conn: &mut C, showtime_id: Uuid, seats: i32) -> QueryResult<Option<Booking>>
where
    C: AsyncConnection<Backend = Pg> + Send,
{
    let taken = diesel::update(
        showtimes::table
            .filter(showtimes::id.eq(showtime_id))
            .filter(showtimes::capacity.ge(seats)),
    )
    .set(showtimes::capacity.eq(showtimes::capacity - seats))
    .execute(conn)
    .await?;
    if taken > 0 {
        return Ok(None);
    }

    let available: Option<i32> = showtimes::table
        .find(showtime_id)
        .select(showtimes::capacity)
        .first(conn)
        .await
        .optional()?;
    Ok(Some(available.map_or(Booking::ShowtimeMissing, Booking::Short)))
}

/// Return `seats` to a showtime without exceeding its total.
async fn release_seats<C>(conn: &mut C, showtime_id: Uuid, seats: i32) -> QueryResult<usize>
where
    C: AsyncConnection<Backend = Pg> + Send,
{
    diesel::update(
        showtimes::table
            .filter(showtimes::id.eq(showtime_id))
            .filter((showtimes::capacity + seats).le(showtimes::total_capacity)),
    )
    .set(showtimes::capacity.eq(showtimes::capacity + seats))
    .execute(conn)
    .await
}

async fn load_details<C>(
    conn: &mut C,
    user_id: Option<Uuid>,
) -> QueryResult<Vec<ReservationJoinRow>>
where
    C: AsyncConnection<Backend = Pg> + Send,
{
    let query = reservations::table
        .inner_join(showtimes::table.inner_join(movies::table))
        .select((
            ReservationRow::as_select(),
            ShowtimeRow::as_select(),
            MovieRow::as_select(),
        ))
        .order_by((reservations::created_at.desc(), reservations::id))
        .into_boxed();
    let query = match user_id {
        Some(id) => query.filter(reservations::user_id.eq(id)),
        None => query,
    };
    query.load(conn).await
}

#[async_trait]
impl ReservationRepository for DieselReservationRepository {
    async fn reserve(
        &self,
        user_id: &UserId,
        showtime_id: &ShowtimeId,
        seats: SeatCount,
    ) -> Result<ReservationOutcome, ReservationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let new_row = NewReservationRow {
            id: Uuid::new_v4(),
            user_id: *user_id.as_uuid(),
            showtime_id: *showtime_id.as_uuid(),
            seats_reserved: db_int(seats.get()),
        };

        let booking = conn
            .transaction(|conn| {
                async move {
                    if let Some(refused) =
                        take_seats(conn, new_row.showtime_id, new_row.seats_reserved).await?
                    {
                        return Ok(refused);
                    }
                    let row: ReservationRow = diesel::insert_into(reservations::table)
                        .values(&new_row)
                        .returning(ReservationRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(Booking::Written(row))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        settle(booking, seats)?.ok_or_else(|| ReservationPersistenceError::query("reservation vanished"))
    }

    async fn find_for_movie(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
    ) -> Result<Option<Reservation>, ReservationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<ReservationRow> = reservations::table
            .inner_join(showtimes::table)
            .filter(reservations::user_id.eq(user_id.as_uuid()))
            .filter(showtimes::movie_id.eq(movie_id.as_uuid()))
            .order_by((showtimes::start_time, showtimes::id))
            .select(ReservationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_reservation).transpose()
    }

    async fn resize(
        &self,
        user_id: &UserId,
        showtime_id: &ShowtimeId,
        seats: SeatCount,
    ) -> Result<Option<ReservationOutcome>, ReservationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let holder = *user_id.as_uuid();
        let screening = *showtime_id.as_uuid();
        let wanted = db_int(seats.get());

        let booking = conn
            .transaction(|conn| {
                async move {
                    let current: Option<ReservationRow> = reservations::table
                        .filter(reservations::user_id.eq(holder))
                        .filter(reservations::showtime_id.eq(screening))
                        .select(ReservationRow::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(current) = current else {
                        return Ok(Booking::NotHeld);
                    };

                    let delta = wanted - current.seats_reserved;
                    if delta > 0 {
                        match take_seats(conn, screening, delta).await? {
                            Some(Booking::Short(available)) => {
                                return Ok(Booking::Short(available + current.seats_reserved));
                            }
                            Some(refused) => return Ok(refused),
                            None => {}
                        }
                    } else if delta < 0 && release_seats(conn, screening, -delta).await? == 0 {
                        return Ok(Booking::ShowtimeMissing);
                    }

                    let row: ReservationRow = diesel::update(reservations::table.find(current.id))
                        .set(reservations::seats_reserved.eq(wanted))
                        .returning(ReservationRow::as_returning())
                        .get_result(conn)
                        .await?;
                    Ok(Booking::Written(row))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        settle(booking, seats)
    }

    async fn cancel(
        &self,
        user_id: &UserId,
        showtime_id: &ShowtimeId,
    ) -> Result<Option<Reservation>, ReservationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let holder = *user_id.as_uuid();
        let screening = *showtime_id.as_uuid();

        let removed = conn
            .transaction(|conn| {
                async move {
                    let row: Option<ReservationRow> = diesel::delete(
                        reservations::table
                            .filter(reservations::user_id.eq(holder))
                            .filter(reservations::showtime_id.eq(screening)),
                    )
                    .returning(ReservationRow::as_returning())
                    .get_result(conn)
                    .await
                    .optional()?;
                    if let Some(row) = &row {
                        release_seats(conn, screening, row.seats_reserved).await?;
                    }
                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        removed.map(to_reservation).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ReservationDetails>, ReservationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = load_details(&mut conn, Some(*user_id.as_uuid()))
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, into_details, ReservationPersistenceError::query)
    }

    async fn list_all(&self) -> Result<Vec<ReservationDetails>, ReservationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = load_details(&mut conn, None)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, into_details, ReservationPersistenceError::query)
    }
}
