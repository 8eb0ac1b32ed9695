//! Shared doubles and sample entities for the service unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use crate::domain::ports::{CacheKey, CacheStore, CacheStoreError};
use crate::domain::{
    CacheAside, Email, Location, MediaRef, Movie, MovieId, MovieTitle, Reservation,
    ReservationId, Role, Showtime, ShowtimeId, User, UserId,
};

/// Cache double that keeps entries in memory and records deletions.
#[derive(Default)]
pub(crate) struct RecordingCache {
    entries: Mutex<HashMap<String, String>>,
    deleted: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn aside(self: &Arc<Self>) -> CacheAside {
        CacheAside::new(self.clone())
    }

    pub(crate) fn seed(&self, key: &CacheKey, payload: impl Into<String>) {
        self.entries
            .lock()
            .expect("cache lock")
            .insert(key.to_string(), payload.into());
    }

    pub(crate) fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .expect("cache lock")
            .contains_key(&key.to_string())
    }

    pub(crate) fn was_deleted(&self, key: &CacheKey) -> bool {
        self.deleted
            .lock()
            .expect("cache lock")
            .contains(&key.to_string())
    }
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheStoreError> {
        Ok(self
            .entries
            .lock()
            .expect("cache lock")
            .get(&key.to_string())
            .cloned())
    }

    async fn set(&self, key: &CacheKey, value: &str, _ttl: Duration) -> Result<(), CacheStoreError> {
        self.entries
            .lock()
            .expect("cache lock")
            .insert(key.to_string(), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheStoreError> {
        self.entries
            .lock()
            .expect("cache lock")
            .remove(&key.to_string());
        self.deleted
            .lock()
            .expect("cache lock")
            .push(key.to_string());
        Ok(())
    }
}

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn title(raw: &str) -> MovieTitle {
    MovieTitle::new(raw).expect("valid title")
}

pub(crate) fn sample_user(email: &str, role: Role) -> User {
    User {
        id: UserId::random(),
        email: Email::new(email).expect("valid email"),
        username: None,
        role,
        external_id: None,
        created_at: fixed_now(),
        updated_at: fixed_now(),
    }
}

pub(crate) fn sample_movie(raw_title: &str) -> Movie {
    Movie {
        id: MovieId::random(),
        title: title(raw_title),
        description: "A silent classic".to_owned(),
        genre: "Science fiction".to_owned(),
        poster: MediaRef {
            url: "/media/posters/p.png".to_owned(),
            key: "posters/p.png".to_owned(),
        },
        video: MediaRef {
            url: "/media/videos/v.mp4".to_owned(),
            key: "videos/v.mp4".to_owned(),
        },
        duration_seconds: 9000,
        resolutions: Vec::new(),
        created_at: fixed_now(),
        updated_at: fixed_now(),
    }
}

pub(crate) fn sample_showtime(movie: &Movie, capacity: u32, total: u32) -> Showtime {
    Showtime {
        id: ShowtimeId::random(),
        movie_id: movie.id,
        start_time: fixed_now() + ChronoDuration::days(1),
        end_time: fixed_now() + ChronoDuration::days(1) + ChronoDuration::hours(3),
        location: Location::new("Screen 1").expect("valid location"),
        capacity,
        total_capacity: total,
        created_at: fixed_now(),
        updated_at: fixed_now(),
    }
}

pub(crate) fn sample_reservation(user: UserId, showtime: &Showtime, seats: u32) -> Reservation {
    Reservation {
        id: ReservationId::random(),
        user_id: user,
        showtime_id: showtime.id,
        seats_reserved: seats,
        created_at: fixed_now(),
        updated_at: fixed_now(),
    }
}
