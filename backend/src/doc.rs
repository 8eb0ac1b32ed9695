//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler, the domain read models they
//! return, and the session cookie security scheme. The document backs Swagger
//! UI in debug builds and is exported by the `openapi-dump` binary.

use crate::domain::{
    Error, ErrorCode, Movie, MovieWithShowtimes, Reservation, ReservationDetails, Role, Showtime,
    ShowtimeWithMovie, User,
};
use crate::inbound::http::auth::{LoginRequest, SignupRequest};
use crate::inbound::http::movies::{CreateMovieRequest, MediaUpload, UpdateMovieRequest};
use crate::inbound::http::reservations::{CapacityShortfall, ReservationRequest};
use crate::inbound::http::showtimes::{CreateShowtimeRequest, UpdateShowtimeRequest};
use crate::inbound::http::users::UpdateUserRequest;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Name of the cookie carrying the signed session.
pub const SESSION_COOKIE_NAME: &str = "session";

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                SESSION_COOKIE_NAME,
                "Session cookie issued by POST /api/v1/auth/login or /api/v1/auth/signup.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Cinema reservation API",
        description = "Accounts, movie catalogue, showtime scheduling, and seat reservations.",
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::signup,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::create_admin,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::current_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::movies::list_movies,
        crate::inbound::http::movies::get_movie,
        crate::inbound::http::movies::create_movie,
        crate::inbound::http::movies::update_movie,
        crate::inbound::http::movies::delete_movie,
        crate::inbound::http::movies::stream_movie,
        crate::inbound::http::showtimes::list_showtimes,
        crate::inbound::http::showtimes::get_showtime,
        crate::inbound::http::showtimes::create_showtime,
        crate::inbound::http::showtimes::update_showtime,
        crate::inbound::http::showtimes::delete_showtime,
        crate::inbound::http::reservations::create_reservation,
        crate::inbound::http::reservations::my_reservations,
        crate::inbound::http::reservations::list_reservations,
        crate::inbound::http::reservations::update_reservation,
        crate::inbound::http::reservations::cancel_reservation,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        User,
        Role,
        Movie,
        MovieWithShowtimes,
        Showtime,
        ShowtimeWithMovie,
        Reservation,
        ReservationDetails,
        CapacityShortfall,
        SignupRequest,
        LoginRequest,
        UpdateUserRequest,
        MediaUpload,
        CreateMovieRequest,
        UpdateMovieRequest,
        CreateShowtimeRequest,
        UpdateShowtimeRequest,
        ReservationRequest,
    )),
    tags(
        (name = "auth", description = "Signup, login, and session management"),
        (name = "users", description = "Account administration"),
        (name = "movies", description = "Movie catalogue and streaming"),
        (name = "showtimes", description = "Screening schedule"),
        (name = "reservations", description = "Seat reservations"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
