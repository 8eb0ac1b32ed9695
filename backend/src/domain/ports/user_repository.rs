//! Port abstraction for user persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{
    Email, ExternalId, MovieTitle, PasswordHash, Role, StoredCredentials, User, UserId,
    UserLookup, Username,
};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// A unique column already holds the supplied value.
        Duplicate { field: String } => "user with this {field} already exists",
    }
}

/// Row to insert for a new account.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub id: UserId,
    pub email: Email,
    pub username: Option<Username>,
    pub password_hash: PasswordHash,
    pub role: Role,
    pub external_id: Option<ExternalId>,
}

/// Column changes for an existing account. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<Email>,
    pub username: Option<Username>,
    pub password_hash: Option<PasswordHash>,
    pub role: Option<Role>,
    pub external_id: Option<ExternalId>,
}

/// Result of removing an account together with its reservations.
#[derive(Debug, Clone)]
pub struct DeletedUser {
    pub user: User,
    /// Movies whose showtimes had seats returned by the deletion.
    pub released_titles: Vec<MovieTitle>,
    /// Other users holding seats on the showtimes that got seats back.
    pub co_holders: Vec<UserId>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    async fn insert(&self, record: &NewUserRecord) -> Result<User, UserPersistenceError>;

    /// Fetch an account by any supported lookup.
    async fn find(&self, lookup: &UserLookup) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch an account and its password hash by email.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, UserPersistenceError>;

    /// List every account, oldest first.
    async fn list(&self) -> Result<Vec<User>, UserPersistenceError>;

    /// Apply column changes; `None` when the account does not exist.
    async fn update(
        &self,
        id: &UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// Delete an account, releasing the seats held by its reservations in
    /// the same transaction; `None` when the account does not exist.
    async fn delete(&self, id: &UserId) -> Result<Option<DeletedUser>, UserPersistenceError>;

    /// Store or clear the hashed refresh credential; `false` when the
    /// account does not exist.
    async fn set_refresh_credential(
        &self,
        id: &UserId,
        credential: Option<PasswordHash>,
    ) -> Result<bool, UserPersistenceError>;
}
