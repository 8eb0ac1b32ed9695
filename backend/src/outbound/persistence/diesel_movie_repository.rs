//! PostgreSQL-backed `MovieRepository` implementation using Diesel ORM.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{MovieChanges, MoviePersistenceError, MovieRepository, NewMovieRecord};
use crate::domain::{Movie, MovieId, MovieTitle, MovieWithShowtimes, Showtime, UserId};

use super::diesel_helpers::{
    DieselFailure, classify_diesel_error, collect_rows, corrupt_row_message, pool_error_message,
    unrecognised_violation,
};
use super::models::{MovieRow, MovieUpdate, NewMovieRow, ShowtimeRow, db_int};
use super::pool::{DbPool, PoolError};
use super::schema::{movies, reservations, showtimes};

/// Diesel-backed implementation of the `MovieRepository` port.
#[derive(Clone)]
pub struct DieselMovieRepository {
    pool: DbPool,
}

impl DieselMovieRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> MoviePersistenceError {
    MoviePersistenceError::connection(pool_error_message(error))
}

/// Map Diesel errors to domain movie persistence errors.
///
/// `title` names the movie involved so constraint violations can say which
/// one clashed.
fn map_diesel_error(error: diesel::result::Error, title: &str) -> MoviePersistenceError {
    match classify_diesel_error(error) {
        DieselFailure::Connection(message) => MoviePersistenceError::connection(message),
        DieselFailure::Query(message) => MoviePersistenceError::query(message),
        failure @ DieselFailure::UniqueViolation(_) if failure.names("movies_title_key") => {
            MoviePersistenceError::duplicate_title(title)
        }
        failure @ DieselFailure::ForeignKeyViolation(_) if failure.names("showtimes_movie_id_fkey") => {
            MoviePersistenceError::has_showtimes(title)
        }
        other => MoviePersistenceError::query(unrecognised_violation(&other)),
    }
}

fn to_movie(row: MovieRow) -> Result<Movie, MoviePersistenceError> {
    row.into_movie()
        .map_err(|err| MoviePersistenceError::query(corrupt_row_message(err)))
}

/// Attach showtimes to their movies, keeping the movie order.
fn group_showtimes(
    movie_rows: Vec<MovieRow>,
    showtime_rows: Vec<ShowtimeRow>,
) -> Result<Vec<MovieWithShowtimes>, MoviePersistenceError> {
    let mut by_movie: HashMap<Uuid, Vec<Showtime>> = HashMap::new();
    for showtime in collect_rows(
        showtime_rows,
        ShowtimeRow::into_showtime,
        MoviePersistenceError::query,
    )? {
        by_movie
            .entry(*showtime.movie_id.as_uuid())
            .or_default()
            .push(showtime);
    }

    movie_rows
        .into_iter()
        .map(|row| {
            let showtimes = by_movie.remove(&row.id).unwrap_or_default();
            Ok(MovieWithShowtimes {
                movie: to_movie(row)?,
                showtimes,
            })
        })
        .collect()
}

#[async_trait]
impl MovieRepository for DieselMovieRepository {
    async fn insert(&self, record: &NewMovieRecord) -> Result<Movie, MoviePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let new_row = NewMovieRow {
            id: Uuid::new_v4(),
            title: record.title.as_str(),
            description: &record.description,
            genre: &record.genre,
            poster_url: &record.poster.url,
            poster_key: &record.poster.key,
            video_url: &record.video.url,
            video_key: &record.video.key,
            duration_seconds: db_int(record.duration_seconds),
            resolutions: &record.resolutions,
        };

        let row: MovieRow = diesel::insert_into(movies::table)
            .values(&new_row)
            .returning(MovieRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, record.title.as_str()))?;
        to_movie(row)
    }

    async fn find_by_title(
        &self,
        title: &MovieTitle,
    ) -> Result<Option<Movie>, MoviePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<MovieRow> = movies::table
            .filter(movies::title.eq(title.as_str()))
            .select(MovieRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, title.as_str()))?;
        row.map(to_movie).transpose()
    }

    async fn find_with_showtimes(
        &self,
        title: &MovieTitle,
    ) -> Result<Option<MovieWithShowtimes>, MoviePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let wanted = title.as_str().to_owned();

        let rows = conn
            .transaction(|conn| {
                async move {
                    let movie: Option<MovieRow> = movies::table
                        .filter(movies::title.eq(&wanted))
                        .select(MovieRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(movie) = movie else {
                        return Ok(None);
                    };
                    let screenings: Vec<ShowtimeRow> = showtimes::table
                        .filter(showtimes::movie_id.eq(movie.id))
                        .select(ShowtimeRow::as_select())
                        .order_by((showtimes::start_time, showtimes::id))
                        .load(conn)
                        .await?;
                    Ok(Some((movie, screenings)))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, title.as_str()))?;

        let Some((movie, screenings)) = rows else {
            return Ok(None);
        };
        Ok(group_showtimes(vec![movie], screenings)?.pop())
    }

    async fn list_with_showtimes(&self) -> Result<Vec<MovieWithShowtimes>, MoviePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // One snapshot so a showtime never appears without its movie.
        let (movie_rows, showtime_rows) = conn
            .transaction(|conn| {
                async move {
                    let movie_rows: Vec<MovieRow> = movies::table
                        .select(MovieRow::as_select())
                        .order_by(movies::title)
                        .load(conn)
                        .await?;
                    let showtime_rows: Vec<ShowtimeRow> = showtimes::table
                        .select(ShowtimeRow::as_select())
                        .order_by((showtimes::start_time, showtimes::id))
                        .load(conn)
                        .await?;
                    Ok((movie_rows, showtime_rows))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "catalogue"))?;

        group_showtimes(movie_rows, showtime_rows)
    }

    async fn update(
        &self,
        id: &MovieId,
        changes: &MovieChanges,
    ) -> Result<Option<Movie>, MoviePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let update = MovieUpdate {
            title: changes.title.as_ref().map(MovieTitle::as_str),
            description: changes.description.as_deref(),
            genre: changes.genre.as_deref(),
            poster_url: changes.poster.as_ref().map(|poster| poster.url.as_str()),
            poster_key: changes.poster.as_ref().map(|poster| poster.key.as_str()),
            video_url: changes.video.as_ref().map(|video| video.url.as_str()),
            video_key: changes.video.as_ref().map(|video| video.key.as_str()),
            duration_seconds: changes.duration_seconds.map(db_int),
            resolutions: changes.resolutions.as_deref(),
        };
        let title = changes
            .title
            .as_ref()
            .map_or_else(|| id.to_string(), |title| title.as_str().to_owned());

        let row: Option<MovieRow> = if update.is_empty() {
            movies::table
                .find(*id.as_uuid())
                .select(MovieRow::as_select())
                .first(&mut conn)
                .await
        } else {
            diesel::update(movies::table.find(*id.as_uuid()))
                .set(&update)
                .returning(MovieRow::as_returning())
                .get_result(&mut conn)
                .await
        }
        .optional()
        .map_err(|err| map_diesel_error(err, &title))?;

        row.map(to_movie).transpose()
    }

    async fn delete(&self, id: &MovieId) -> Result<Option<Movie>, MoviePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let movie_id = *id.as_uuid();

        let outcome = conn
            .transaction(|conn| {
                async move {
                    let scheduled: i64 = showtimes::table
                        .filter(showtimes::movie_id.eq(movie_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    if scheduled > 0 {
                        let title: Option<String> = movies::table
                            .find(movie_id)
                            .select(movies::title)
                            .first(conn)
                            .await
                            .optional()?;
                        return Ok(Err(title.unwrap_or_else(|| movie_id.to_string())));
                    }
                    let row: Option<MovieRow> = diesel::delete(movies::table.find(movie_id))
                        .returning(MovieRow::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?;
                    Ok(Ok(row))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, &movie_id.to_string()))?;

        match outcome {
            Ok(row) => row.map(to_movie).transpose(),
            Err(title) => Err(MoviePersistenceError::has_showtimes(title)),
        }
    }

    async fn reservation_holders(&self, id: &MovieId) -> Result<Vec<UserId>, MoviePersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let holders: Vec<Uuid> = reservations::table
            .inner_join(showtimes::table)
            .filter(showtimes::movie_id.eq(id.as_uuid()))
            .select(reservations::user_id)
            .distinct()
            .order_by(reservations::user_id)
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, &id.to_string()))?;
        Ok(holders.into_iter().map(UserId::from_uuid).collect())
    }
}
