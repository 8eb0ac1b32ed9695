//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod error;
pub mod health;
pub mod movies;
pub mod reservations;
pub mod session;
pub mod showtimes;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

pub use error::ApiResult;

use actix_web::web;

/// Largest JSON body accepted; movie uploads carry base64 media inline.
pub const JSON_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// JSON extractor configuration shared by every endpoint.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(error::json_error_handler)
}

/// Register every `/api/v1` handler on `cfg`.
///
/// Literal segments such as `/users/me` are registered ahead of the
/// parameterised routes they would otherwise be captured by.
pub fn api_services(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::signup)
        .service(auth::login)
        .service(auth::logout)
        .service(auth::create_admin)
        .service(users::current_user)
        .service(users::list_users)
        .service(users::update_user)
        .service(users::delete_user)
        .service(movies::list_movies)
        .service(movies::create_movie)
        .service(movies::stream_movie)
        .service(movies::get_movie)
        .service(movies::update_movie)
        .service(movies::delete_movie)
        .service(showtimes::list_showtimes)
        .service(showtimes::get_showtime)
        .service(showtimes::create_showtime)
        .service(showtimes::update_showtime)
        .service(showtimes::delete_showtime)
        .service(reservations::my_reservations)
        .service(reservations::list_reservations)
        .service(reservations::create_reservation)
        .service(reservations::update_reservation)
        .service(reservations::cancel_reservation);
}
