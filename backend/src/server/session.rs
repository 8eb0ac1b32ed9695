//! Session cookie settings derived from [`ServerSettings`].
//!
//! Debug builds fall back to permissive defaults with a warning; release
//! builds refuse to start on anything that would weaken the session cookie.

use std::path::{Path, PathBuf};

use actix_web::cookie::{Key, SameSite};
use tracing::warn;
use zeroize::Zeroize;

use super::config::ServerSettings;

const SESSION_KEY_DEFAULT_PATH: &str = "/var/run/secrets/session_key";
const SESSION_KEY_MIN_LEN: usize = 64;
const SAMESITE_EXPECTED: &str = "Strict|Lax|None";

/// Build mode for session configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    Debug,
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Validated cookie session parameters.
#[derive(Clone)]
pub struct SessionSettings {
    pub key: Key,
    pub cookie_secure: bool,
    pub same_site: SameSite,
}

/// Errors raised while validating session configuration.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    #[error("invalid session_same_site '{value}'; expected {expected}")]
    InvalidSameSite {
        value: String,
        expected: &'static str,
    },
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    #[error("session_same_site=None requires cookie_secure")]
    InsecureSameSiteNone,
    #[error("session_allow_ephemeral must be off in release builds")]
    EphemeralNotAllowed,
}

impl SessionSettings {
    /// Validate the session-related settings for `mode`.
    pub fn from_settings(
        settings: &ServerSettings,
        mode: BuildMode,
    ) -> Result<Self, SessionConfigError> {
        if settings.session_allow_ephemeral && !mode.is_debug() {
            return Err(SessionConfigError::EphemeralNotAllowed);
        }
        let cookie_secure = settings.cookie_secure;
        let same_site = same_site(settings.session_same_site.as_deref(), mode, cookie_secure)?;
        let path = settings
            .session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(SESSION_KEY_DEFAULT_PATH));
        let key = session_key(&path, mode, settings.session_allow_ephemeral)?;

        Ok(Self {
            key,
            cookie_secure,
            same_site,
        })
    }
}

fn same_site(
    value: Option<&str>,
    mode: BuildMode,
    cookie_secure: bool,
) -> Result<SameSite, SessionConfigError> {
    let default_same_site = if mode.is_debug() {
        SameSite::Lax
    } else {
        SameSite::Strict
    };
    let Some(value) = value else {
        return Ok(default_same_site);
    };

    match value.to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" if cookie_secure => Ok(SameSite::None),
        "none" if mode.is_debug() => {
            warn!("session_same_site=None without a secure cookie; browsers may drop it");
            Ok(SameSite::None)
        }
        "none" => Err(SessionConfigError::InsecureSameSiteNone),
        _ if mode.is_debug() => {
            warn!(value = %value, "invalid session_same_site, using default");
            Ok(default_same_site)
        }
        _ => Err(SessionConfigError::InvalidSameSite {
            value: value.to_owned(),
            expected: SAMESITE_EXPECTED,
        }),
    }
}

fn session_key(
    path: &Path,
    mode: BuildMode,
    allow_ephemeral: bool,
) -> Result<Key, SessionConfigError> {
    match std::fs::read(path) {
        Ok(mut bytes) => {
            let length = bytes.len();
            if mode == BuildMode::Release && length < SESSION_KEY_MIN_LEN {
                bytes.zeroize();
                return Err(SessionConfigError::KeyTooShort {
                    path: path.to_path_buf(),
                    length,
                    min_len: SESSION_KEY_MIN_LEN,
                });
            }
            let key = Key::derive_from(&bytes);
            bytes.zeroize();
            Ok(key)
        }
        Err(error) if mode.is_debug() || allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %error,
                "using temporary session key (dev only)"
            );
            Ok(Key::generate())
        }
        Err(error) => Err(SessionConfigError::KeyRead {
            path: path.to_path_buf(),
            source: error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn settings(key_file: Option<PathBuf>) -> ServerSettings {
        ServerSettings {
            bind_addr: None,
            database_url: None,
            db_pool_size: None,
            redis_url: None,
            media_root: None,
            media_base_url: None,
            movie_cache_ttl_secs: None,
            showtime_cache_ttl_secs: None,
            user_cache_ttl_secs: None,
            reservation_cache_ttl_secs: None,
            session_key_file: key_file,
            session_allow_ephemeral: false,
            cookie_secure: true,
            session_same_site: None,
            admin_email: None,
            admin_password: None,
        }
    }

    fn key_file(len: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&vec![b'k'; len]).expect("write key");
        file
    }

    #[rstest]
    fn release_build_accepts_a_full_length_key() {
        let file = key_file(SESSION_KEY_MIN_LEN);
        let loaded = SessionSettings::from_settings(
            &settings(Some(file.path().to_path_buf())),
            BuildMode::Release,
        )
        .expect("valid settings");
        assert!(loaded.cookie_secure);
        assert_eq!(loaded.same_site, SameSite::Strict);
    }

    #[rstest]
    fn release_build_rejects_short_keys() {
        let file = key_file(8);
        let err = SessionSettings::from_settings(
            &settings(Some(file.path().to_path_buf())),
            BuildMode::Release,
        )
        .err()
        .expect("short key rejected");
        assert!(matches!(err, SessionConfigError::KeyTooShort { length: 8, .. }));
    }

    #[rstest]
    #[case(BuildMode::Debug, false, true)]
    #[case(BuildMode::Release, false, false)]
    fn missing_key_file_needs_debug_build(
        #[case] mode: BuildMode,
        #[case] allow_ephemeral: bool,
        #[case] accepted: bool,
    ) {
        let mut config = settings(Some(PathBuf::from("/nonexistent/cinema/session_key")));
        config.session_allow_ephemeral = allow_ephemeral;
        assert_eq!(SessionSettings::from_settings(&config, mode).is_ok(), accepted);
    }

    #[rstest]
    fn release_build_refuses_ephemeral_keys() {
        let mut config = settings(None);
        config.session_allow_ephemeral = true;
        let err = SessionSettings::from_settings(&config, BuildMode::Release)
            .err()
            .expect("rejected");
        assert!(matches!(err, SessionConfigError::EphemeralNotAllowed));
    }

    #[rstest]
    #[case(Some("lax"), true, BuildMode::Release, Some(SameSite::Lax))]
    #[case(Some("STRICT"), true, BuildMode::Release, Some(SameSite::Strict))]
    #[case(Some("None"), true, BuildMode::Release, Some(SameSite::None))]
    #[case(Some("None"), false, BuildMode::Release, None)]
    #[case(Some("None"), false, BuildMode::Debug, Some(SameSite::None))]
    #[case(Some("sideways"), true, BuildMode::Release, None)]
    #[case(Some("sideways"), true, BuildMode::Debug, Some(SameSite::Lax))]
    #[case(None, true, BuildMode::Debug, Some(SameSite::Lax))]
    fn same_site_policy_is_validated(
        #[case] value: Option<&str>,
        #[case] secure: bool,
        #[case] mode: BuildMode,
        #[case] expected: Option<SameSite>,
    ) {
        assert_eq!(same_site(value, mode, secure).ok(), expected);
    }
}
