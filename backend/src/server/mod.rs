//! Server construction and middleware wiring.

mod config;
mod session;
mod state_builders;

pub use config::{AdminSeed, ServerSettings, SettingsError};
pub use session::{BuildMode, SessionConfigError, SessionSettings};
pub use state_builders::{
    Adapters, Persistence, build_cache, build_http_state, build_media, build_persistence,
    seed_admin,
};

use std::net::SocketAddr;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use cinema::Trace;
#[cfg(debug_assertions)]
use cinema::doc::ApiDoc;
use cinema::doc::SESSION_COOKIE_NAME;
use cinema::domain::Error;
use cinema::domain::ports::{CacheStoreError, MediaStoreError};
use cinema::inbound::http::health::{HealthState, live, ready};
use cinema::inbound::http::state::HttpState;
use cinema::inbound::http::{api_services, json_config};
use cinema::outbound::persistence::{MigrationError, PoolError};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Failures that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Session(#[from] SessionConfigError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("cache unavailable: {0}")]
    Cache(#[from] CacheStoreError),
    #[error("media store unavailable: {0}")]
    Media(#[from] MediaStoreError),
    #[error("bootstrap failed: {0}")]
    Domain(#[from] Error),
}

/// Everything needed to bind and run the HTTP server.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) state: HttpState,
}

impl ServerConfig {
    #[must_use]
    pub fn new(session: SessionSettings, bind_addr: SocketAddr, state: HttpState) -> Self {
        Self {
            session,
            bind_addr,
            state,
        }
    }
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    session: SessionSettings,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        session,
    } = deps;

    let session_middleware = SessionMiddleware::builder(CookieSessionStore::default(), session.key)
        .cookie_name(SESSION_COOKIE_NAME.into())
        .cookie_path("/".into())
        .cookie_secure(session.cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(session.same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1")
        .wrap(session_middleware)
        .configure(api_services);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server and mark it ready once bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        session,
        bind_addr,
        state,
    } = config;
    let http_state = web::Data::new(state);
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            session: session.clone(),
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
