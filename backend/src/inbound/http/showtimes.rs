//! Showtime scheduling handlers.
//!
//! Screenings are addressed through their movie's title; when a movie has
//! several, `matchStartTime` (or the `startTime` query on delete) picks one and
//! the earliest is used otherwise.
//!
//! ```text
//! GET    /api/v1/showtimes
//! GET    /api/v1/showtimes/{title}
//! POST   /api/v1/showtimes/{title} {"startTime":"2026-03-01T19:00:00Z","endTime":"...","location":"Screen 1","capacity":120}
//! PATCH  /api/v1/showtimes/{title} {"totalCapacity":150}
//! DELETE /api/v1/showtimes/{title}?startTime=2026-03-01T19:00:00Z
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, NewShowtime, Showtime, ShowtimePatch, ShowtimeWithMovie};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_optional_rfc3339_timestamp, parse_rfc3339_timestamp, parse_title,
};

const START_TIME: FieldName = FieldName::new("startTime");
const END_TIME: FieldName = FieldName::new("endTime");

/// New screening body. Timestamps are RFC 3339.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShowtimeRequest {
    #[schema(example = "2026-03-01T19:00:00Z")]
    pub start_time: String,
    #[schema(example = "2026-03-01T21:30:00Z")]
    pub end_time: String,
    #[schema(example = "Screen 1")]
    pub location: String,
    #[schema(example = 120)]
    pub capacity: i64,
}

/// Partial screening update.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShowtimeRequest {
    /// Start time of the screening to change; the earliest when absent.
    pub match_start_time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    /// New seat total; seats already reserved are kept.
    pub total_capacity: Option<i64>,
}

/// Selector for `DELETE /showtimes/{title}`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ShowtimeSelector {
    /// Start time of the screening to cancel; the earliest when absent.
    pub start_time: Option<String>,
}

/// Every screening with its movie.
#[utoipa::path(
    get,
    path = "/api/v1/showtimes",
    responses(
        (status = 200, description = "Showtimes ordered by start time", body = [ShowtimeWithMovie]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["showtimes"],
    operation_id = "listShowtimes"
)]
#[get("/showtimes")]
pub async fn list_showtimes(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<ShowtimeWithMovie>>> {
    session.require_principal()?;
    Ok(web::Json(state.showtimes.list_showtimes().await?))
}

/// The earliest screening of a movie.
#[utoipa::path(
    get,
    path = "/api/v1/showtimes/{title}",
    params(("title" = String, Path, description = "Movie title")),
    responses(
        (status = 200, description = "Showtime", body = ShowtimeWithMovie),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Movie or showtime not found", body = Error)
    ),
    tags = ["showtimes"],
    operation_id = "getShowtime"
)]
#[get("/showtimes/{title}")]
pub async fn get_showtime(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ShowtimeWithMovie>> {
    session.require_principal()?;
    let title = parse_title(&path)?;
    Ok(web::Json(state.showtimes.find_showtime(&title).await?))
}

/// Schedule a screening.
#[utoipa::path(
    post,
    path = "/api/v1/showtimes/{title}",
    params(("title" = String, Path, description = "Movie title")),
    request_body = CreateShowtimeRequest,
    responses(
        (status = 201, description = "Showtime created", body = Showtime),
        (status = 400, description = "Invalid window, location or capacity", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Movie not found", body = Error)
    ),
    tags = ["showtimes"],
    operation_id = "createShowtime"
)]
#[post("/showtimes/{title}")]
pub async fn create_showtime(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<CreateShowtimeRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_admin()?;
    let title = parse_title(&path)?;
    let request = payload.into_inner();
    let showtime = NewShowtime::new(
        parse_rfc3339_timestamp(&request.start_time, START_TIME)?,
        parse_rfc3339_timestamp(&request.end_time, END_TIME)?,
        &request.location,
        request.capacity,
    )?;
    let created = state
        .showtimes
        .create_showtime(&principal, &title, showtime)
        .await?;
    Ok(HttpResponse::Created().json(created))
}

/// Change a screening.
#[utoipa::path(
    patch,
    path = "/api/v1/showtimes/{title}",
    params(("title" = String, Path, description = "Movie title")),
    request_body = UpdateShowtimeRequest,
    responses(
        (status = 200, description = "Showtime updated", body = Showtime),
        (status = 400, description = "Invalid request or capacity below reserved seats", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Movie or showtime not found", body = Error)
    ),
    tags = ["showtimes"],
    operation_id = "updateShowtime"
)]
#[patch("/showtimes/{title}")]
pub async fn update_showtime(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateShowtimeRequest>,
) -> ApiResult<web::Json<Showtime>> {
    let principal = session.require_admin()?;
    let title = parse_title(&path)?;
    let request = payload.into_inner();
    let showtime_patch = ShowtimePatch::new(
        parse_optional_rfc3339_timestamp(
            request.match_start_time.as_deref(),
            FieldName::new("matchStartTime"),
        )?,
        parse_optional_rfc3339_timestamp(request.start_time.as_deref(), START_TIME)?,
        parse_optional_rfc3339_timestamp(request.end_time.as_deref(), END_TIME)?,
        request.location.as_deref(),
        request.total_capacity,
    )?;
    let updated = state
        .showtimes
        .update_showtime(&principal, &title, showtime_patch)
        .await?;
    Ok(web::Json(updated))
}

/// Cancel a screening together with its reservations.
#[utoipa::path(
    delete,
    path = "/api/v1/showtimes/{title}",
    params(("title" = String, Path, description = "Movie title"), ShowtimeSelector),
    responses(
        (status = 200, description = "Showtime deleted", body = Showtime),
        (status = 400, description = "Invalid selector", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Movie or showtime not found", body = Error)
    ),
    tags = ["showtimes"],
    operation_id = "deleteShowtime"
)]
#[delete("/showtimes/{title}")]
pub async fn delete_showtime(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<ShowtimeSelector>,
) -> ApiResult<web::Json<Showtime>> {
    let principal = session.require_admin()?;
    let title = parse_title(&path)?;
    let start_time = parse_optional_rfc3339_timestamp(query.start_time.as_deref(), START_TIME)?;
    let deleted = state
        .showtimes
        .delete_showtime(&principal, &title, start_time)
        .await?;
    Ok(web::Json(deleted))
}

#[cfg(test)]
#[path = "showtimes_tests.rs"]
mod tests;
