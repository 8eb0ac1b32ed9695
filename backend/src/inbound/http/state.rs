//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{MovieCatalog, SeatReservations, ShowtimeScheduling, UserAccounts};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub users: Arc<dyn UserAccounts>,
    pub movies: Arc<dyn MovieCatalog>,
    pub showtimes: Arc<dyn ShowtimeScheduling>,
    pub reservations: Arc<dyn SeatReservations>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub users: Arc<dyn UserAccounts>,
    pub movies: Arc<dyn MovieCatalog>,
    pub showtimes: Arc<dyn ShowtimeScheduling>,
    pub reservations: Arc<dyn SeatReservations>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from the driving ports.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use cinema::domain::ports::{
    ///     MovieCatalog, SeatReservations, ShowtimeScheduling, UserAccounts,
    /// };
    /// use cinema::inbound::http::state::{HttpState, HttpStatePorts};
    ///
    /// fn wire(
    ///     users: Arc<dyn UserAccounts>,
    ///     movies: Arc<dyn MovieCatalog>,
    ///     showtimes: Arc<dyn ShowtimeScheduling>,
    ///     reservations: Arc<dyn SeatReservations>,
    /// ) -> HttpState {
    ///     HttpState::new(HttpStatePorts { users, movies, showtimes, reservations })
    /// }
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            users,
            movies,
            showtimes,
            reservations,
        } = ports;
        Self {
            users,
            movies,
            showtimes,
            reservations,
        }
    }
}
