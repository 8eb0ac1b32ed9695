//! Server settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `CINEMA_*` environment variables, and the
//! configuration file, in that order of precedence.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use cinema::domain::CacheTtls;
use cinema::outbound::persistence::PoolConfig;
use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MEDIA_ROOT: &str = "./media";
const DEFAULT_MEDIA_BASE_URL: &str = "/media";

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind address '{value}': {message}")]
    InvalidBindAddr { value: String, message: String },
    #[error("admin seeding needs both admin_email and admin_password")]
    IncompleteAdminSeed,
}

/// Runtime configuration for the HTTP server and its adapters.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CINEMA")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; in-memory repositories are used when absent.
    pub database_url: Option<String>,
    /// Maximum connections in the database pool.
    pub db_pool_size: Option<u32>,
    /// Redis URL; an in-process cache is used when absent.
    pub redis_url: Option<String>,
    /// Directory holding uploaded posters and videos.
    pub media_root: Option<PathBuf>,
    /// Public URL prefix under which stored media is served.
    pub media_base_url: Option<String>,
    pub movie_cache_ttl_secs: Option<u64>,
    pub showtime_cache_ttl_secs: Option<u64>,
    pub user_cache_ttl_secs: Option<u64>,
    pub reservation_cache_ttl_secs: Option<u64>,
    /// File holding the session signing key.
    pub session_key_file: Option<PathBuf>,
    /// Permit a generated session key when the key file is unreadable.
    #[ortho_config(default = false)]
    pub session_allow_ephemeral: bool,
    /// Mark session cookies `Secure`.
    #[ortho_config(default = true)]
    pub cookie_secure: bool,
    /// `SameSite` policy for session cookies: Strict, Lax, or None.
    pub session_same_site: Option<String>,
    /// Email of an administrator created at start-up when missing.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

/// Credentials for the start-up administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl ServerSettings {
    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
                message: err.to_string(),
            })
    }

    /// Pool configuration when a database is configured.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        let url = self.database_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        let config = PoolConfig::new(url);
        Some(match self.db_pool_size {
            Some(size) => config.with_max_size(size),
            None => config,
        })
    }

    /// Redis URL, ignoring blank values.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn media_root(&self) -> PathBuf {
        self.media_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT))
    }

    pub fn media_base_url(&self) -> &str {
        self.media_base_url
            .as_deref()
            .unwrap_or(DEFAULT_MEDIA_BASE_URL)
    }

    /// Cache lifetimes, falling back to the defaults per family.
    pub fn cache_ttls(&self) -> CacheTtls {
        let defaults = CacheTtls::default();
        let pick = |secs: Option<u64>, fallback: Duration| {
            secs.map(Duration::from_secs).unwrap_or(fallback)
        };
        CacheTtls {
            movies: pick(self.movie_cache_ttl_secs, defaults.movies),
            showtimes: pick(self.showtime_cache_ttl_secs, defaults.showtimes),
            users: pick(self.user_cache_ttl_secs, defaults.users),
            reservations: pick(self.reservation_cache_ttl_secs, defaults.reservations),
        }
    }

    /// Administrator to create at start-up, if one is configured.
    pub fn admin_seed(&self) -> Result<Option<AdminSeed>, SettingsError> {
        match (&self.admin_email, &self.admin_password) {
            (None, None) => Ok(None),
            (Some(email), Some(password)) => Ok(Some(AdminSeed {
                email: email.clone(),
                password: password.clone(),
            })),
            _ => Err(SettingsError::IncompleteAdminSeed),
        }
    }
}
