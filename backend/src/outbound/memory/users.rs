//! `UserRepository` over the in-memory tables.

use async_trait::async_trait;

use crate::domain::ports::{
    DeletedUser, NewUserRecord, UserChanges, UserPersistenceError, UserRepository,
};
use crate::domain::{
    Email, ExternalId, MovieTitle, PasswordHash, StoredCredentials, User, UserId, UserLookup,
    Username,
};

use super::{MemoryDatabase, Tables, UserEntry};

fn matches(user: &User, lookup: &UserLookup) -> bool {
    match lookup {
        UserLookup::ById(id) => &user.id == id,
        UserLookup::ByEmail(email) => &user.email == email,
        UserLookup::ByUsername(name) => user.username.as_ref() == Some(name),
        UserLookup::ByExternalId(external) => user.external_id.as_ref() == Some(external),
    }
}

/// The unique column the given values would clash on, ignoring `except`.
fn clash(
    tables: &Tables,
    except: Option<UserId>,
    email: Option<&Email>,
    username: Option<&Username>,
    external_id: Option<&ExternalId>,
) -> Option<&'static str> {
    let others = || {
        tables
            .users
            .values()
            .map(|entry| &entry.user)
            .filter(move |user| Some(user.id) != except)
    };
    if let Some(email) = email {
        if others().any(|user| &user.email == email) {
            return Some("email");
        }
    }
    if let Some(name) = username {
        if others().any(|user| user.username.as_ref() == Some(name)) {
            return Some("username");
        }
    }
    if let Some(external) = external_id {
        if others().any(|user| user.external_id.as_ref() == Some(external)) {
            return Some("external id");
        }
    }
    None
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn insert(&self, record: &NewUserRecord) -> Result<User, UserPersistenceError> {
        let now = self.now();
        let mut tables = self.tables();
        if let Some(field) = clash(
            &tables,
            None,
            Some(&record.email),
            record.username.as_ref(),
            record.external_id.as_ref(),
        ) {
            return Err(UserPersistenceError::duplicate(field));
        }
        let user = User {
            id: record.id,
            email: record.email.clone(),
            username: record.username.clone(),
            role: record.role,
            external_id: record.external_id.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            user.id,
            UserEntry {
                user: user.clone(),
                password_hash: record.password_hash.clone(),
                refresh_credential: None,
            },
        );
        Ok(user)
    }

    async fn find(&self, lookup: &UserLookup) -> Result<Option<User>, UserPersistenceError> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|entry| matches(&entry.user, lookup))
            .map(|entry| entry.user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, UserPersistenceError> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|entry| &entry.user.email == email)
            .map(|entry| StoredCredentials {
                user: entry.user.clone(),
                password_hash: entry.password_hash.clone(),
            }))
    }

    async fn list(&self) -> Result<Vec<User>, UserPersistenceError> {
        let mut users: Vec<User> = self
            .tables()
            .users
            .values()
            .map(|entry| entry.user.clone())
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update(
        &self,
        id: &UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, UserPersistenceError> {
        let now = self.now();
        let mut tables = self.tables();
        if !tables.users.contains_key(id) {
            return Ok(None);
        }
        if let Some(field) = clash(
            &tables,
            Some(*id),
            changes.email.as_ref(),
            changes.username.as_ref(),
            changes.external_id.as_ref(),
        ) {
            return Err(UserPersistenceError::duplicate(field));
        }
        let Some(entry) = tables.users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            entry.user.email = email.clone();
        }
        if let Some(name) = &changes.username {
            entry.user.username = Some(name.clone());
        }
        if let Some(hash) = &changes.password_hash {
            entry.password_hash = hash.clone();
        }
        if let Some(role) = changes.role {
            entry.user.role = role;
        }
        if let Some(external) = &changes.external_id {
            entry.user.external_id = Some(external.clone());
        }
        entry.user.updated_at = now;
        Ok(Some(entry.user.clone()))
    }

    async fn delete(&self, id: &UserId) -> Result<Option<DeletedUser>, UserPersistenceError> {
        let mut tables = self.tables();
        let Some(entry) = tables.users.remove(id) else {
            return Ok(None);
        };

        let held: Vec<_> = tables
            .reservations
            .values()
            .filter(|reservation| &reservation.user_id == id)
            .map(|reservation| (reservation.id, reservation.showtime_id, reservation.seats_reserved))
            .collect();

        let released_showtimes: Vec<_> = held
            .iter()
            .map(|(_, showtime_id, _)| *showtime_id)
            .collect();
        let mut released_titles: Vec<MovieTitle> = Vec::new();
        for (reservation_id, showtime_id, seats) in held {
            tables.reservations.remove(&reservation_id);
            let Some(showtime) = tables.showtimes.get_mut(&showtime_id) else {
                continue;
            };
            showtime.capacity = showtime.capacity.saturating_add(seats).min(showtime.total_capacity);
            let movie_id = showtime.movie_id;
            if let Some(movie) = tables.movies.get(&movie_id) {
                released_titles.push(movie.title.clone());
            }
        }
        released_titles.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        released_titles.dedup();

        let mut co_holders: Vec<UserId> = tables
            .reservations
            .values()
            .filter(|reservation| released_showtimes.contains(&reservation.showtime_id))
            .map(|reservation| reservation.user_id)
            .collect();
        co_holders.sort();
        co_holders.dedup();

        Ok(Some(DeletedUser {
            user: entry.user,
            released_titles,
            co_holders,
        }))
    }

    async fn set_refresh_credential(
        &self,
        id: &UserId,
        credential: Option<PasswordHash>,
    ) -> Result<bool, UserPersistenceError> {
        let mut tables = self.tables();
        let Some(entry) = tables.users.get_mut(id) else {
            return Ok(false);
        };
        entry.refresh_credential = credential;
        Ok(true)
    }
}
