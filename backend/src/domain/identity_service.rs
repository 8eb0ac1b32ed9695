//! Account management and credential checks.
//!
//! Implements the [`UserAccounts`] driving port. Accounts are cached under
//! every lookup form they can be reached by, so each mutation invalidates all
//! of them along with the account list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    CacheKey, NewUserRecord, PasswordHasher, PasswordHasherError, UserAccounts, UserChanges,
    UserPersistenceError, UserRepository,
};
use crate::domain::{
    CacheAside, CacheTtls, Email, Error, ExternalId, NewUser, Password, PasswordHash, Principal,
    Role, User, UserId, UserLookup, UserPatch, Username,
};

/// Identity service implementing [`UserAccounts`].
#[derive(Clone)]
pub struct IdentityService<U, H> {
    users: Arc<U>,
    hasher: Arc<H>,
    cache: CacheAside,
    ttl: Duration,
}

impl<U, H> IdentityService<U, H> {
    /// Create a service over the given repository, hasher, and cache.
    pub fn new(users: Arc<U>, hasher: Arc<H>, cache: CacheAside, ttls: &CacheTtls) -> Self {
        Self {
            users,
            hasher,
            cache,
            ttl: ttls.users,
        }
    }
}

fn map_user_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserPersistenceError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserPersistenceError::Duplicate { field } => {
            Error::conflict(format!("user with this {field} already exists"))
                .with_details(json!({ "field": field, "code": "duplicate" }))
        }
    }
}

fn map_hasher_error(error: PasswordHasherError) -> Error {
    Error::internal(error.to_string())
}

fn duplicate(field: &str) -> Error {
    map_user_error(UserPersistenceError::duplicate(field))
}

fn invalid_credentials() -> Error {
    Error::unauthorized("invalid credentials")
}

/// Every cache key an account can be read through.
fn user_keys(user: &User) -> Vec<CacheKey> {
    let mut keys = vec![
        CacheKey::User(UserLookup::ById(user.id)),
        CacheKey::User(UserLookup::ByEmail(user.email.clone())),
        CacheKey::AllUsers,
    ];
    if let Some(username) = &user.username {
        keys.push(CacheKey::User(UserLookup::ByUsername(username.clone())));
    }
    if let Some(external) = &user.external_id {
        keys.push(CacheKey::User(UserLookup::ByExternalId(external.clone())));
    }
    keys
}

impl<U, H> IdentityService<U, H>
where
    U: UserRepository,
    H: PasswordHasher,
{
    async fn lookup_uncached(&self, lookup: &UserLookup) -> Result<Option<User>, Error> {
        self.users.find(lookup).await.map_err(map_user_error)
    }

    /// Fail with `Conflict` when `lookup` resolves to an account other than `owner`.
    async fn ensure_unclaimed(
        &self,
        lookup: UserLookup,
        field: &str,
        owner: Option<&UserId>,
    ) -> Result<(), Error> {
        match self.lookup_uncached(&lookup).await? {
            Some(existing) if Some(&existing.id) != owner => Err(duplicate(field)),
            _ => Ok(()),
        }
    }

    async fn insert_account(
        &self,
        new_user: NewUser,
        role: Role,
        external_id: Option<ExternalId>,
    ) -> Result<User, Error> {
        let password_hash = self
            .hasher
            .hash(&new_user.password)
            .map_err(map_hasher_error)?;
        let record = NewUserRecord {
            id: UserId::random(),
            email: new_user.email,
            username: new_user.username,
            password_hash,
            role,
            external_id,
        };
        let user = self.users.insert(&record).await.map_err(map_user_error)?;
        self.cache.invalidate(user_keys(&user)).await;
        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    fn hash_optional(&self, password: Option<&Password>) -> Result<Option<PasswordHash>, Error> {
        password
            .map(|secret| self.hasher.hash(secret))
            .transpose()
            .map_err(map_hasher_error)
    }

    async fn link_external_id(&self, user: User, external_id: ExternalId) -> Result<User, Error> {
        let changes = UserChanges {
            external_id: Some(external_id),
            ..UserChanges::default()
        };
        let linked = self
            .users
            .update(&user.id, &changes)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found("user not found"))?;
        self.cache.invalidate(user_keys(&linked)).await;
        info!(user_id = %linked.id, "external identity linked");
        Ok(linked)
    }
}

#[async_trait]
impl<U, H> UserAccounts for IdentityService<U, H>
where
    U: UserRepository,
    H: PasswordHasher,
{
    async fn create_user(&self, new_user: NewUser, role: Role) -> Result<User, Error> {
        self.ensure_unclaimed(UserLookup::ByEmail(new_user.email.clone()), "email", None)
            .await?;
        if let Some(username) = &new_user.username {
            self.ensure_unclaimed(UserLookup::ByUsername(username.clone()), "username", None)
                .await?;
        }
        self.insert_account(new_user, role, None).await
    }

    async fn create_admin(&self, principal: &Principal, new_user: NewUser) -> Result<User, Error> {
        principal.require_admin()?;
        self.create_user(new_user, Role::Admin).await
    }

    async fn find_user(&self, lookup: &UserLookup) -> Result<User, Error> {
        let key = CacheKey::User(lookup.clone());
        self.cache
            .get_or_load(&key, self.ttl, || self.lookup_uncached(lookup))
            .await?
            .ok_or_else(|| Error::not_found("user not found"))
    }

    async fn list_users(&self, principal: &Principal) -> Result<Vec<User>, Error> {
        principal.require_admin()?;
        let users = self
            .cache
            .get_or_load(&CacheKey::AllUsers, self.ttl, || async {
                self.users.list().await.map(Some).map_err(map_user_error)
            })
            .await?;
        Ok(users.unwrap_or_default())
    }

    async fn update_user(
        &self,
        principal: &Principal,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<User, Error> {
        principal.require_self_or_admin(id)?;
        if patch.role.is_some() && !principal.is_admin() {
            return Err(Error::forbidden("only administrators may change roles"));
        }
        if patch.is_empty() {
            return Err(Error::invalid_request("no changes supplied"));
        }

        let current = self
            .lookup_uncached(&UserLookup::ById(*id))
            .await?
            .ok_or_else(|| Error::not_found("user not found"))?;
        if let Some(email) = patch.email.as_ref().filter(|email| **email != current.email) {
            self.ensure_unclaimed(UserLookup::ByEmail(email.clone()), "email", Some(id))
                .await?;
        }
        if let Some(username) = &patch.username {
            self.ensure_unclaimed(UserLookup::ByUsername(username.clone()), "username", Some(id))
                .await?;
        }

        let changes = UserChanges {
            password_hash: self.hash_optional(patch.password.as_ref())?,
            email: patch.email,
            username: patch.username,
            role: patch.role,
            external_id: None,
        };
        let updated = self
            .users
            .update(id, &changes)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found("user not found"))?;

        let mut keys = user_keys(&current);
        keys.extend(user_keys(&updated));
        self.cache.invalidate(keys).await;
        info!(user_id = %updated.id, "user updated");
        Ok(updated)
    }

    async fn delete_user(&self, principal: &Principal, id: &UserId) -> Result<User, Error> {
        principal.require_admin()?;
        let deleted = self
            .users
            .delete(id)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found("user not found"))?;

        let mut keys = user_keys(&deleted.user);
        keys.push(CacheKey::UserReservations(deleted.user.id));
        keys.push(CacheKey::AllReservations);
        for title in &deleted.released_titles {
            keys.extend(CacheKey::for_movie(title));
        }
        keys.extend(CacheKey::for_holders(&deleted.co_holders));
        self.cache.invalidate(keys).await;
        info!(
            user_id = %deleted.user.id,
            released = deleted.released_titles.len(),
            "user deleted"
        );
        Ok(deleted.user)
    }

    async fn get_or_create_by_external_id(
        &self,
        email: Email,
        external_id: ExternalId,
        username: Option<Username>,
    ) -> Result<User, Error> {
        if let Some(user) = self
            .lookup_uncached(&UserLookup::ByExternalId(external_id.clone()))
            .await?
        {
            return Ok(user);
        }
        if let Some(user) = self.lookup_uncached(&UserLookup::ByEmail(email.clone())).await? {
            return self.link_external_id(user, external_id).await;
        }

        let username = match username {
            Some(name) => {
                let taken = self
                    .lookup_uncached(&UserLookup::ByUsername(name.clone()))
                    .await?
                    .is_some();
                (!taken).then_some(name)
            }
            None => None,
        };
        // External accounts never log in with a password; store an unguessable one.
        let placeholder = Password::candidate(hex::encode(rand::random::<[u8; 32]>()));
        let new_user = NewUser {
            email: email.clone(),
            password: placeholder,
            username,
        };
        match self
            .insert_account(new_user, Role::Customer, Some(external_id.clone()))
            .await
        {
            Ok(user) => Ok(user),
            Err(error) if error.code() == crate::domain::ErrorCode::Conflict => self
                .lookup_uncached(&UserLookup::ByExternalId(external_id))
                .await?
                .ok_or(error),
            Err(error) => Err(error),
        }
    }

    async fn verify_credentials(&self, email: &Email, password: &Password) -> Result<User, Error> {
        let stored = self
            .users
            .find_credentials(email)
            .await
            .map_err(map_user_error)?
            .ok_or_else(invalid_credentials)?;
        if !self.hasher.verify(password, &stored.password_hash) {
            return Err(invalid_credentials());
        }
        Ok(stored.user)
    }

    async fn rotate_refresh_credential(
        &self,
        id: &UserId,
        credential: Option<Password>,
    ) -> Result<(), Error> {
        let hash = self.hash_optional(credential.as_ref())?;
        let found = self
            .users
            .set_refresh_credential(id, hash)
            .await
            .map_err(map_user_error)?;
        if !found {
            return Err(Error::not_found("user not found"));
        }
        self.cache
            .invalidate([CacheKey::User(UserLookup::ById(*id))])
            .await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "identity_service_tests.rs"]
mod tests;
