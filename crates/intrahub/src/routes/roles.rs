use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use intrahub_core::{RoleCheck, UserId};
use serde::Deserialize;
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleCheckRequest {
    user_id_param: Option<String>,
}

/// Whether a user holds the elevated role, as a bare JSON boolean.
///
/// Unlike the in-process check, a failed lookup is reported to the caller,
/// as is a server started without its secret key.
pub async fn is_super_admin(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RoleCheckRequest>, JsonRejection>,
) -> ApiResult<Json<bool>> {
    state.mail()?;
    let Json(request) = body?;
    let user = request
        .user_id_param
        .filter(|id| !id.trim().is_empty())
        .map(UserId::new)
        .ok_or_else(|| ApiError::bad_request("user_id_param is required"))?;

    match state.roles.role_of(&user).await {
        Ok(role) => Ok(Json(RoleCheck::from_role(role.as_deref()).is_elevated())),
        Err(e) => {
            error!(user = %user, error = %e, "Role lookup failed");
            Err(ApiError::internal(e.to_string()))
        }
    }
}
