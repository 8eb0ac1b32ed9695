//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, web};

use crate::domain::ports::{
    MockMovieCatalog, MockSeatReservations, MockShowtimeScheduling, MockUserAccounts,
};
use crate::domain::{Error, Principal, Role, UserId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::{HttpState, HttpStatePorts};

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// The `session` cookie set on `response`.
pub fn session_cookie(response: &ServiceResponse) -> Cookie<'static> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Mocked driving ports; tests set expectations before building the state.
#[derive(Default)]
pub struct MockPorts {
    pub users: MockUserAccounts,
    pub movies: MockMovieCatalog,
    pub showtimes: MockShowtimeScheduling,
    pub reservations: MockSeatReservations,
}

impl MockPorts {
    pub fn into_state(self) -> HttpState {
        HttpState::new(HttpStatePorts {
            users: Arc::new(self.users),
            movies: Arc::new(self.movies),
            showtimes: Arc::new(self.showtimes),
            reservations: Arc::new(self.reservations),
        })
    }
}

/// A principal with a fixed id for `role`.
pub fn principal(role: Role) -> Principal {
    let id = match role {
        Role::Admin => "11111111-1111-4111-8111-111111111111",
        Role::Customer => "22222222-2222-4222-8222-222222222222",
    };
    Principal::new(UserId::new(id).expect("fixture id"), role)
}

async fn sign_in(
    session: SessionContext,
    raw: web::Path<(String, String)>,
) -> Result<HttpResponse, Error> {
    let (id, role) = raw.into_inner();
    let id = UserId::new(id).map_err(|err| Error::invalid_request(err.to_string()))?;
    let role = role.parse::<Role>()?;
    session.persist_principal(&Principal::new(id, role))?;
    Ok(HttpResponse::NoContent().finish())
}

/// Path that signs a test client in as `principal`.
pub fn sign_in_uri(principal: &Principal) -> String {
    format!("/test/sign-in/{}/{}", principal.user_id, principal.role.as_str())
}

/// App with the full API over `state` plus a sign-in shortcut for tests.
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(super::json_config())
        .wrap(test_session_middleware())
        .route("/test/sign-in/{id}/{role}", web::post().to(sign_in))
        .service(web::scope("/api/v1").configure(super::api_services))
}

/// Sign in as `principal` and return the session cookie.
pub async fn signed_in<S>(app: &S, principal: &Principal) -> Cookie<'static>
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = actix_web::test::TestRequest::post()
        .uri(&sign_in_uri(principal))
        .to_request();
    let res = actix_web::test::call_service(app, req).await;
    assert!(res.status().is_success(), "test sign-in failed");
    session_cookie(&res)
}
