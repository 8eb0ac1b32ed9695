//! Authentication handlers.
//!
//! ```text
//! POST /api/v1/auth/signup {"email":"ada@example.com","password":"correct horse"}
//! POST /api/v1/auth/login  {"email":"ada@example.com","password":"correct horse"}
//! POST /api/v1/auth/logout
//! POST /api/v1/auth/admins
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Email, Error, NewUser, Password, Principal, Role, User, Username};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Signup request body; also used to create administrators.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl TryFrom<SignupRequest> for NewUser {
    type Error = Error;

    fn try_from(value: SignupRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            email: Email::new(&value.email)?,
            password: Password::new(value.password)?,
            username: value.username.as_deref().map(Username::new).transpose()?,
        })
    }
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register a customer account and sign it in.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = User,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 409, description = "Email or username taken", body = Error),
        (status = 503, description = "Persistence unavailable", body = Error)
    ),
    tags = ["auth"],
    operation_id = "signup",
    security([])
)]
#[post("/auth/signup")]
pub async fn signup(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SignupRequest>,
) -> ApiResult<HttpResponse> {
    let new_user = NewUser::try_from(payload.into_inner())?;
    let user = state.users.create_user(new_user, Role::Customer).await?;
    session.persist_principal(&principal_of(&user))?;
    Ok(HttpResponse::Created().json(user))
}

/// Check credentials and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = User,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let LoginRequest { email, password } = payload.into_inner();
    // Unknown and malformed emails get the same answer as a wrong password.
    let email = Email::new(&email).map_err(|_| Error::unauthorized("invalid credentials"))?;
    let user = state
        .users
        .verify_credentials(&email, &Password::candidate(password))
        .await?;
    session.persist_principal(&principal_of(&user))?;
    info!(user_id = %user.id, "user signed in");
    Ok(HttpResponse::Ok().json(user))
}

/// End the session and revoke the stored refresh credential.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "No session", body = Error)
    ),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout")]
pub async fn logout(state: web::Data<HttpState>, session: SessionContext) -> ApiResult<HttpResponse> {
    let principal = session.require_principal()?;
    session.clear();
    state
        .users
        .rotate_refresh_credential(&principal.user_id, None)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register another administrator.
#[utoipa::path(
    post,
    path = "/api/v1/auth/admins",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Administrator created", body = User),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "No session", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 409, description = "Email or username taken", body = Error)
    ),
    tags = ["auth"],
    operation_id = "createAdmin"
)]
#[post("/auth/admins")]
pub async fn create_admin(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SignupRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_admin()?;
    let new_user = NewUser::try_from(payload.into_inner())?;
    let user = state.users.create_admin(&principal, new_user).await?;
    Ok(HttpResponse::Created().json(user))
}

fn principal_of(user: &User) -> Principal {
    Principal::new(user.id, user.role)
}
