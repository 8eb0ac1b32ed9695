//! PostgreSQL-backed `ShowtimeRepository` implementation using Diesel ORM.
//!
//! Resizing a showtime moves `capacity` by the same delta as
//! `total_capacity` in a single conditional `UPDATE`, so a concurrent
//! reservation can never observe a total below the seats already held.
//! Deleting a showtime locks its row before listing the holders whose
//! reservations cascade with it.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    DeletedShowtime, ShowtimeChanges, ShowtimePersistenceError, ShowtimeRepository,
};
use crate::domain::{MovieId, NewShowtime, Showtime, ShowtimeId, ShowtimeWithMovie, UserId};

use super::diesel_helpers::{
    DieselFailure, classify_diesel_error, corrupt_row_message, pool_error_message,
    unrecognised_violation,
};
use super::models::{MovieRow, NewShowtimeRow, ShowtimeRow, ShowtimeUpdate, db_int};
use super::pool::{DbPool, PoolError};
use super::schema::{movies, reservations, showtimes};

/// Diesel-backed implementation of the `ShowtimeRepository` port.
#[derive(Clone)]
pub struct DieselShowtimeRepository {
    pool: DbPool,
}

impl DieselShowtimeRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Outcome of the update transaction.
enum Revision {
    Updated(ShowtimeRow),
    Missing,
    BelowReserved(i32),
}

fn map_pool_error(error: PoolError) -> ShowtimePersistenceError {
    ShowtimePersistenceError::connection(pool_error_message(error))
}

/// Map Diesel errors to domain showtime persistence errors.
fn map_diesel_error(error: diesel::result::Error) -> ShowtimePersistenceError {
    match classify_diesel_error(error) {
        DieselFailure::Connection(message) => ShowtimePersistenceError::connection(message),
        DieselFailure::Query(message) => ShowtimePersistenceError::query(message),
        failure @ DieselFailure::ForeignKeyViolation(_)
            if failure.names("showtimes_movie_id_fkey") =>
        {
            ShowtimePersistenceError::query("movie no longer exists")
        }
        other => ShowtimePersistenceError::query(unrecognised_violation(&other)),
    }
}

fn to_showtime(row: ShowtimeRow) -> Result<Showtime, ShowtimePersistenceError> {
    row.into_showtime()
        .map_err(|err| ShowtimePersistenceError::query(corrupt_row_message(err)))
}

fn reserved_count(reserved: i32) -> u32 {
    u32::try_from(reserved).unwrap_or_default()
}

async fn load_showtime<C>(conn: &mut C, id: Uuid) -> QueryResult<Option<ShowtimeRow>>
where
    C: AsyncConnection<Backend = Pg> + Send,
{
    showtimes::table
        .find(id)
        .select(ShowtimeRow::as_select())
        .first(conn)
        .await
        .optional()
}

/// Apply a capacity change, shifting the live count by the same delta.
///
/// Zero rows means either the showtime is gone or the new total would drop
/// below the reserved seats; a follow-up read tells the two apart.
async fn resize_capacity<C>(conn: &mut C, id: Uuid, total: i32) -> QueryResult<Option<Revision>>
where
    C: AsyncConnection<Backend = Pg> + Send,
{
    let updated = diesel::update(
        showtimes::table
            .filter(showtimes::id.eq(id))
            .filter((showtimes::total_capacity - showtimes::capacity).le(total)),
    )
    .set((
        showtimes::capacity.eq(showtimes::capacity + total - showtimes::total_capacity),
        showtimes::total_capacity.eq(total),
    ))
    .execute(conn)
    .await?;

    if updated > 0 {
        return Ok(None);
    }
    Ok(Some(match load_showtime(conn, id).await? {
        Some(row) => Revision::BelowReserved(row.total_capacity - row.capacity),
        None => Revision::Missing,
    }))
}

#[async_trait]
impl ShowtimeRepository for DieselShowtimeRepository {
    async fn insert(
        &self,
        movie_id: &MovieId,
        showtime: &NewShowtime,
    ) -> Result<Showtime, ShowtimePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let seats = db_int(showtime.capacity);
        let new_row = NewShowtimeRow {
            id: Uuid::new_v4(),
            movie_id: *movie_id.as_uuid(),
            start_time: showtime.start_time,
            end_time: showtime.end_time,
            location: showtime.location.as_str(),
            capacity: seats,
            total_capacity: seats,
        };

        let row: ShowtimeRow = diesel::insert_into(showtimes::table)
            .values(&new_row)
            .returning(ShowtimeRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_showtime(row)
    }

    async fn list_for_movie(
        &self,
        movie_id: &MovieId,
    ) -> Result<Vec<Showtime>, ShowtimePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ShowtimeRow> = showtimes::table
            .filter(showtimes::movie_id.eq(movie_id.as_uuid()))
            .select(ShowtimeRow::as_select())
            .order_by((showtimes::start_time, showtimes::id))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(to_showtime).collect()
    }

    async fn list_with_movies(&self) -> Result<Vec<ShowtimeWithMovie>, ShowtimePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<(ShowtimeRow, MovieRow)> = showtimes::table
            .inner_join(movies::table)
            .select((ShowtimeRow::as_select(), MovieRow::as_select()))
            .order_by((showtimes::start_time, showtimes::id))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(|(showtime, movie)| {
                Ok(ShowtimeWithMovie {
                    showtime: to_showtime(showtime)?,
                    movie: movie
                        .into_movie()
                        .map_err(|err| ShowtimePersistenceError::query(corrupt_row_message(err)))?,
                })
            })
            .collect()
    }

    async fn update(
        &self,
        id: &ShowtimeId,
        changes: &ShowtimeChanges,
    ) -> Result<Option<Showtime>, ShowtimePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let showtime_id = *id.as_uuid();
        let new_total = changes.total_capacity.map(db_int);
        let descriptive = ShowtimeUpdate {
            start_time: changes.start_time,
            end_time: changes.end_time,
            location: changes.location.as_ref().map(|location| location.as_str()),
        };

        let revision = conn
            .transaction(|conn| {
                async move {
                    if let Some(total) = new_total {
                        if let Some(rejected) = resize_capacity(conn, showtime_id, total).await? {
                            return Ok(rejected);
                        }
                    }
                    if !descriptive.is_empty() {
                        diesel::update(showtimes::table.find(showtime_id))
                            .set(&descriptive)
                            .execute(conn)
                            .await?;
                    }
                    Ok(match load_showtime(conn, showtime_id).await? {
                        Some(row) => Revision::Updated(row),
                        None => Revision::Missing,
                    })
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        match revision {
            Revision::Updated(row) => to_showtime(row).map(Some),
            Revision::Missing => Ok(None),
            Revision::BelowReserved(reserved) => Err(
                ShowtimePersistenceError::capacity_below_reserved(reserved_count(reserved)),
            ),
        }
    }

    async fn delete(
        &self,
        id: &ShowtimeId,
    ) -> Result<Option<DeletedShowtime>, ShowtimePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let showtime_id = *id.as_uuid();

        let deleted = conn
            .transaction(|conn| {
                async move {
                    // Reservations commit against the locked row, so the
                    // holder list read below is the one the delete removes.
                    let locked: Option<Uuid> = showtimes::table
                        .find(showtime_id)
                        .select(showtimes::id)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    if locked.is_none() {
                        return Ok(None);
                    }
                    let holders: Vec<Uuid> = reservations::table
                        .filter(reservations::showtime_id.eq(showtime_id))
                        .select(reservations::user_id)
                        .order_by(reservations::user_id)
                        .load(conn)
                        .await?;
                    let row: Option<ShowtimeRow> =
                        diesel::delete(showtimes::table.find(showtime_id))
                            .returning(ShowtimeRow::as_returning())
                            .get_result(conn)
                            .await
                            .optional()?;
                    Ok(row.map(|row| (row, holders)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let Some((row, holders)) = deleted else {
            return Ok(None);
        };
        Ok(Some(DeletedShowtime {
            showtime: to_showtime(row)?,
            affected_users: holders.into_iter().map(UserId::from_uuid).collect(),
        }))
    }
}
