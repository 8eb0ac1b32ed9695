//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! The signed session cookie carries the caller's [`Principal`]. Handlers ask
//! for it through [`SessionContext`] and hand it to the driving ports, which
//! re-check roles themselves.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Error, Principal, Role, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const ROLE_KEY: &str = "role";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated principal in the session cookie.
    pub fn persist_principal(&self, principal: &Principal) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, principal.user_id.to_string())
            .and_then(|()| self.0.insert(ROLE_KEY, principal.role.as_str()))
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the current principal, if the cookie carries a valid one.
    pub fn principal(&self) -> Result<Option<Principal>, Error> {
        let read = |key: &str| {
            self.0
                .get::<String>(key)
                .map_err(|error| Error::internal(format!("failed to read session: {error}")))
        };
        let (Some(raw_id), Some(raw_role)) = (read(USER_ID_KEY)?, read(ROLE_KEY)?) else {
            return Ok(None);
        };
        let user_id = match UserId::new(&raw_id) {
            Ok(id) => id,
            Err(error) => {
                warn!("invalid user id in session cookie: {error}");
                return Ok(None);
            }
        };
        match raw_role.parse::<Role>() {
            Ok(role) => Ok(Some(Principal::new(user_id, role))),
            Err(error) => {
                warn!("invalid role in session cookie: {error}");
                Ok(None)
            }
        }
    }

    /// Require an authenticated principal or return `401 Unauthorized`.
    pub fn require_principal(&self) -> Result<Principal, Error> {
        self.principal()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Require an administrator: `401` without a session, `403` for customers.
    pub fn require_admin(&self) -> Result<Principal, Error> {
        let principal = self.require_principal()?;
        principal.require_admin()?;
        Ok(principal)
    }

    /// Drop every value stored in the session.
    pub fn clear(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
