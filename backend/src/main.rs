//! Backend entry-point: loads settings, prepares storage, and serves the API.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

mod server;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use cinema::inbound::http::health::HealthState;
use server::{
    Adapters, BuildMode, ServerConfig, ServerSettings, SessionSettings, build_cache,
    build_http_state, build_media, build_persistence, create_server, seed_admin,
};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load().wrap_err("load server settings")?;
    let mode = BuildMode::from_debug_assertions();
    let session = SessionSettings::from_settings(&settings, mode)?;
    let bind_addr = settings.bind_addr()?;

    let adapters = Adapters {
        persistence: build_persistence(&settings).await?,
        cache: build_cache(&settings).await?,
        media: build_media(&settings)?,
        ttls: settings.cache_ttls(),
    };
    let state = build_http_state(&adapters);
    if let Some(seed) = settings.admin_seed()? {
        seed_admin(state.users.as_ref(), &seed).await?;
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state.clone(),
        ServerConfig::new(session, bind_addr, state),
    )
    .wrap_err_with(|| format!("bind {bind_addr}"))?;
    info!(%bind_addr, "cinema backend listening");

    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome.wrap_err("server terminated")
}
