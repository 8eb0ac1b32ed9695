//! Account handlers.
//!
//! ```text
//! GET    /api/v1/users
//! GET    /api/v1/users/me
//! PATCH  /api/v1/users/{id} {"username":"ada"}
//! DELETE /api/v1/users/{id}
//! ```

use actix_web::{delete, get, patch, web};
use serde::{Deserialize, Serialize};

use crate::domain::{Email, Error, Password, Role, User, UserLookup, UserPatch, Username};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_user_id};

/// Partial account update; absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl TryFrom<UpdateUserRequest> for UserPatch {
    type Error = Error;

    fn try_from(value: UpdateUserRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            email: value.email.as_deref().map(Email::new).transpose()?,
            username: value.username.as_deref().map(Username::new).transpose()?,
            password: value.password.map(Password::new).transpose()?,
            role: value.role,
        })
    }
}

/// List every account.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users", body = [User]),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 503, description = "Persistence unavailable", body = Error)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<User>>> {
    let principal = session.require_admin()?;
    let users = state.users.list_users(&principal).await?;
    Ok(web::Json(users))
}

/// The signed-in account.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Account no longer exists", body = Error)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<User>> {
    let principal = session.require_principal()?;
    let user = state
        .users
        .find_user(&UserLookup::ById(principal.user_id))
        .await?;
    Ok(web::Json(user))
}

/// Change an account; owners may edit themselves, admins anyone.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "Account identifier")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "Email or username taken", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[patch("/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateUserRequest>,
) -> ApiResult<web::Json<User>> {
    let principal = session.require_principal()?;
    let id = parse_user_id(&path, FieldName::new("id"))?;
    let patch = UserPatch::try_from(payload.into_inner())?;
    let user = state.users.update_user(&principal, &id, patch).await?;
    Ok(web::Json(user))
}

/// Remove an account, releasing its reserved seats.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "Account identifier")),
    responses(
        (status = 200, description = "Deleted user", body = User),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<User>> {
    let principal = session.require_admin()?;
    let id = parse_user_id(&path, FieldName::new("id"))?;
    let user = state.users.delete_user(&principal, &id).await?;
    Ok(web::Json(user))
}

#[cfg(test)]
mod tests;
