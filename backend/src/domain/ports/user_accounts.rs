//! Driving port for account management and authentication.
use async_trait::async_trait;

use crate::domain::{
    Email, Error, ExternalId, NewUser, Password, Principal, Role, User, UserId, UserLookup,
    UserPatch, Username,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserAccounts: Send + Sync {
    /// Register a new account with `role`.
    async fn create_user(&self, new_user: NewUser, role: Role) -> Result<User, Error>;

    /// Register another administrator; admin only.
    async fn create_admin(&self, principal: &Principal, new_user: NewUser) -> Result<User, Error>;

    /// Fetch an account through the cache.
    async fn find_user(&self, lookup: &UserLookup) -> Result<User, Error>;

    /// List every account; admin only.
    async fn list_users(&self, principal: &Principal) -> Result<Vec<User>, Error>;

    /// Change an account; the owner or an admin. Only admins may change roles.
    async fn update_user(
        &self,
        principal: &Principal,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<User, Error>;

    /// Remove an account and its reservations; admin only.
    async fn delete_user(&self, principal: &Principal, id: &UserId) -> Result<User, Error>;

    /// Resolve the account for an external identity, linking or creating it.
    async fn get_or_create_by_external_id(
        &self,
        email: Email,
        external_id: ExternalId,
        username: Option<Username>,
    ) -> Result<User, Error>;

    /// Check an email and password pair.
    async fn verify_credentials(&self, email: &Email, password: &Password) -> Result<User, Error>;

    /// Store the hash of a new refresh credential, or clear it with `None`.
    async fn rotate_refresh_credential(
        &self,
        id: &UserId,
        credential: Option<Password>,
    ) -> Result<(), Error>;
}
