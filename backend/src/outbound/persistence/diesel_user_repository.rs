//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Deleting an account returns the seats held by its reservations to their
//! showtimes inside the same transaction as the delete; the reservations
//! themselves go with the `ON DELETE CASCADE` foreign key.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    DeletedUser, NewUserRecord, UserChanges, UserPersistenceError, UserRepository,
};
use crate::domain::{Email, MovieTitle, PasswordHash, StoredCredentials, User, UserId, UserLookup};

use super::diesel_helpers::{
    DieselFailure, classify_diesel_error, corrupt_row_message, pool_error_message,
    unrecognised_violation,
};
use super::models::{NewUserRow, UserRow, UserUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::{movies, reservations, showtimes, users};

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    UserPersistenceError::connection(pool_error_message(error))
}

/// Map Diesel errors to domain user persistence errors.
fn map_diesel_error(error: diesel::result::Error) -> UserPersistenceError {
    let failure = classify_diesel_error(error);
    if let Some(field) = duplicate_field(&failure) {
        return UserPersistenceError::duplicate(field);
    }
    match failure {
        DieselFailure::Connection(message) => UserPersistenceError::connection(message),
        DieselFailure::Query(message) => UserPersistenceError::query(message),
        other => UserPersistenceError::query(unrecognised_violation(&other)),
    }
}

fn duplicate_field(failure: &DieselFailure) -> Option<&'static str> {
    if !matches!(failure, DieselFailure::UniqueViolation(_)) {
        return None;
    }
    [
        ("users_email_key", "email"),
        ("users_username_key", "username"),
        ("users_external_id_key", "external id"),
    ]
    .into_iter()
    .find_map(|(constraint, field)| failure.names(constraint).then_some(field))
}

fn to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    row.into_user()
        .map_err(|err| UserPersistenceError::query(corrupt_row_message(err)))
}

fn to_titles(titles: Vec<String>) -> Result<Vec<MovieTitle>, UserPersistenceError> {
    titles
        .into_iter()
        .map(|title| {
            MovieTitle::new(&title)
                .map_err(|err| UserPersistenceError::query(format!("stored title is invalid: {err}")))
        })
        .collect()
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, record: &NewUserRecord) -> Result<User, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let new_row = NewUserRow {
            id: *record.id.as_uuid(),
            email: record.email.as_str(),
            username: record.username.as_ref().map(|name| name.as_str()),
            password_hash: record.password_hash.as_str(),
            role: record.role.as_str(),
            external_id: record.external_id.as_ref().map(|id| id.as_str()),
        };

        let row: UserRow = diesel::insert_into(users::table)
            .values(&new_row)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_user(row)
    }

    async fn find(&self, lookup: &UserLookup) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let query = users::table.select(UserRow::as_select()).into_boxed();
        let query = match lookup {
            UserLookup::ById(id) => query.filter(users::id.eq(*id.as_uuid())),
            UserLookup::ByEmail(email) => query.filter(users::email.eq(email.as_str())),
            UserLookup::ByUsername(name) => {
                query.filter(users::username.eq(name.as_str()))
            }
            UserLookup::ByExternalId(external) => {
                query.filter(users::external_id.eq(external.as_str()))
            }
        };

        let row: Option<UserRow> = query
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_user).transpose()
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(|row| {
            row.into_credentials()
                .map_err(|err| UserPersistenceError::query(corrupt_row_message(err)))
        })
        .transpose()
    }

    async fn list(&self) -> Result<Vec<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<UserRow> = users::table
            .select(UserRow::as_select())
            .order_by((users::created_at, users::id))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(to_user).collect()
    }

    async fn update(
        &self,
        id: &UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let update = UserUpdate {
            email: changes.email.as_ref().map(|email| email.as_str()),
            username: changes.username.as_ref().map(|name| name.as_str()),
            password_hash: changes.password_hash.as_ref().map(PasswordHash::as_str),
            role: changes.role.map(|role| role.as_str()),
            external_id: changes.external_id.as_ref().map(|external| external.as_str()),
        };

        let row: Option<UserRow> = if update.is_empty() {
            users::table
                .find(*id.as_uuid())
                .select(UserRow::as_select())
                .first(&mut conn)
                .await
        } else {
            diesel::update(users::table.find(*id.as_uuid()))
                .set(&update)
                .returning(UserRow::as_returning())
                .get_result(&mut conn)
                .await
        }
        .optional()
        .map_err(map_diesel_error)?;

        row.map(to_user).transpose()
    }

    async fn delete(&self, id: &UserId) -> Result<Option<DeletedUser>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let user_id = *id.as_uuid();

        let deleted = conn
            .transaction(|conn| {
                async move {
                    let held: Vec<(Uuid, i32)> = reservations::table
                        .filter(reservations::user_id.eq(user_id))
                        .select((reservations::showtime_id, reservations::seats_reserved))
                        .for_update()
                        .load(conn)
                        .await?;

                    for (showtime_id, seats) in &held {
                        diesel::update(showtimes::table.find(*showtime_id))
                            .set(showtimes::capacity.eq(showtimes::capacity + *seats))
                            .execute(conn)
                            .await?;
                    }

                    let showtime_ids: Vec<Uuid> = held.iter().map(|(id, _)| *id).collect();
                    let co_holders: Vec<Uuid> = reservations::table
                        .filter(reservations::showtime_id.eq_any(&showtime_ids))
                        .filter(reservations::user_id.ne(user_id))
                        .select(reservations::user_id)
                        .distinct()
                        .order_by(reservations::user_id)
                        .load(conn)
                        .await?;
                    let titles: Vec<String> = movies::table
                        .inner_join(showtimes::table)
                        .filter(showtimes::id.eq_any(showtime_ids))
                        .select(movies::title)
                        .distinct()
                        .order_by(movies::title)
                        .load(conn)
                        .await?;

                    let row: Option<UserRow> = diesel::delete(users::table.find(user_id))
                        .returning(UserRow::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?;

                    Ok(row.map(|row| (row, titles, co_holders)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let Some((row, titles, co_holders)) = deleted else {
            return Ok(None);
        };
        Ok(Some(DeletedUser {
            user: to_user(row)?,
            released_titles: to_titles(titles)?,
            co_holders: co_holders.into_iter().map(UserId::from_uuid).collect(),
        }))
    }

    async fn set_refresh_credential(
        &self,
        id: &UserId,
        credential: Option<PasswordHash>,
    ) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(users::table.find(*id.as_uuid()))
            .set(users::refresh_credential.eq(credential.as_ref().map(PasswordHash::as_str)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }
}
