//! Driving port for seat reservations.
use async_trait::async_trait;

use crate::domain::{
    Error, MovieTitle, Principal, Reservation, ReservationDetails, ReservationOutcome,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeatReservations: Send + Sync {
    /// Reserve `seats` at the titled movie's showtime for the caller.
    async fn create_reservation(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        seats: i64,
    ) -> Result<ReservationOutcome, Error>;

    /// The caller's reservations, through the cache.
    async fn find_my_reservations(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ReservationDetails>, Error>;

    /// Every reservation; admin only.
    async fn list_all_reservations(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ReservationDetails>, Error>;

    /// Change the seat count of the caller's reservation for the title.
    async fn update_reservation(
        &self,
        principal: &Principal,
        title: &MovieTitle,
        seats: i64,
    ) -> Result<ReservationOutcome, Error>;

    /// Cancel the caller's reservation for the title, releasing its seats.
    async fn cancel_reservation(
        &self,
        principal: &Principal,
        title: &MovieTitle,
    ) -> Result<Reservation, Error>;
}
