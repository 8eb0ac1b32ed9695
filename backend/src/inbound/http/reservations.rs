//! Seat reservation handlers.
//!
//! A short showtime is not an error: the service reports it as an outcome and
//! the handlers answer `409` with `code = "insufficient_capacity"` and the
//! seat counts, leaving the showtime untouched.
//!
//! ```text
//! POST   /api/v1/reservations {"title":"Metropolis","seats":2}
//! GET    /api/v1/reservations/me
//! GET    /api/v1/reservations
//! PATCH  /api/v1/reservations {"title":"Metropolis","seats":4}
//! DELETE /api/v1/reservations/{title}
//! ```

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Error, Reservation, ReservationDetails, ReservationOutcome};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_title;

/// Stable code for the capacity shortfall body.
pub const INSUFFICIENT_CAPACITY: &str = "insufficient_capacity";

/// Seats to hold at the titled movie's earliest showtime.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    #[schema(example = "Metropolis")]
    pub title: String,
    #[schema(example = 2)]
    pub seats: i64,
}

/// `409` body returned when a showtime cannot cover the request.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapacityShortfall {
    #[schema(example = "insufficient_capacity")]
    pub code: String,
    pub message: String,
    pub requested: u32,
    pub available: u32,
}

fn outcome_response(outcome: ReservationOutcome, confirmed: StatusCode) -> HttpResponse {
    match outcome {
        ReservationOutcome::Confirmed(reservation) => HttpResponse::build(confirmed).json(reservation),
        ReservationOutcome::InsufficientCapacity {
            requested,
            available,
        } => {
            info!(requested, available, "reservation rejected for capacity");
            HttpResponse::Conflict().json(CapacityShortfall {
                code: INSUFFICIENT_CAPACITY.to_owned(),
                message: format!("only {available} seats available, {requested} requested"),
                requested,
                available,
            })
        }
    }
}

/// Reserve seats.
#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    request_body = ReservationRequest,
    responses(
        (status = 201, description = "Reservation confirmed", body = Reservation),
        (status = 400, description = "Invalid seat count", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Movie or showtime not found", body = Error),
        (status = 409, description = "Not enough seats, or already reserved", body = CapacityShortfall)
    ),
    tags = ["reservations"],
    operation_id = "createReservation"
)]
#[post("/reservations")]
pub async fn create_reservation(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ReservationRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let request = payload.into_inner();
    let title = parse_title(&request.title)?;
    let outcome = state
        .reservations
        .create_reservation(&principal, &title, request.seats)
        .await?;
    Ok(outcome_response(outcome, StatusCode::CREATED))
}

/// The caller's reservations, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/reservations/me",
    responses(
        (status = 200, description = "Reservations", body = [ReservationDetails]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["reservations"],
    operation_id = "listMyReservations"
)]
#[get("/reservations/me")]
pub async fn my_reservations(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<ReservationDetails>>> {
    let principal = session.require_principal()?;
    Ok(web::Json(
        state.reservations.find_my_reservations(&principal).await?,
    ))
}

/// Every reservation in the system.
#[utoipa::path(
    get,
    path = "/api/v1/reservations",
    responses(
        (status = 200, description = "Reservations", body = [ReservationDetails]),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["reservations"],
    operation_id = "listReservations"
)]
#[get("/reservations")]
pub async fn list_reservations(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<ReservationDetails>>> {
    let principal = session.require_admin()?;
    Ok(web::Json(
        state.reservations.list_all_reservations(&principal).await?,
    ))
}

/// Change the seat count of the caller's reservation.
#[utoipa::path(
    patch,
    path = "/api/v1/reservations",
    request_body = ReservationRequest,
    responses(
        (status = 200, description = "Reservation updated", body = Reservation),
        (status = 400, description = "Invalid seat count", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "No reservation for this movie", body = Error),
        (status = 409, description = "Not enough seats", body = CapacityShortfall)
    ),
    tags = ["reservations"],
    operation_id = "updateReservation"
)]
#[patch("/reservations")]
pub async fn update_reservation(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ReservationRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    let request = payload.into_inner();
    let title = parse_title(&request.title)?;
    let outcome = state
        .reservations
        .update_reservation(&principal, &title, request.seats)
        .await?;
    Ok(outcome_response(outcome, StatusCode::OK))
}

/// Cancel the caller's reservation and release its seats.
#[utoipa::path(
    delete,
    path = "/api/v1/reservations/{title}",
    params(("title" = String, Path, description = "Movie title")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "No reservation for this movie", body = Error)
    ),
    tags = ["reservations"],
    operation_id = "cancelReservation"
)]
#[delete("/reservations/{title}")]
pub async fn cancel_reservation(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Reservation>> {
    let principal = session.require_principal()?;
    let title = parse_title(&path)?;
    Ok(web::Json(
        state
            .reservations
            .cancel_reservation(&principal, &title)
            .await?,
    ))
}

#[cfg(test)]
#[path = "reservations_tests.rs"]
mod tests;
