//! Driving port for scheduling screenings.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Error, MovieTitle, NewShowtime, Principal, Showtime, ShowtimePatch, ShowtimeWithMovie,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShowtimeScheduling: Send + Sync {
    /// Schedule a screening of the titled movie; admin only.
    async fn create_showtime(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        showtime: NewShowtime,
    ) -> Result<Showtime, Error>;

    /// The earliest screening of the titled movie, through the cache.
    async fn find_showtime(&self, title: &MovieTitle) -> Result<ShowtimeWithMovie, Error>;

    /// Every screening with its movie, through the cache.
    async fn list_showtimes(&self) -> Result<Vec<ShowtimeWithMovie>, Error>;

    /// Change a screening of the titled movie; admin only.
    async fn update_showtime(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        patch: ShowtimePatch,
    ) -> Result<Showtime, Error>;

    /// Cancel a screening and its reservations; admin only. `start_time`
    /// selects the screening, defaulting to the earliest.
    async fn delete_showtime(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Showtime, Error>;
}
