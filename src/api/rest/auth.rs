use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::engine::directory::resolve_caller;
use crate::error::AppError;
use crate::models::user::{Caller, UserRole};
use crate::state::AppState;

/// Header carrying the id of the acting user.
pub const USER_ID_HEADER: &str = "x-user-id";

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;

        resolve_caller(state, user_id)
    }
}

pub fn require_admin(caller: &Caller) -> Result<(), AppError> {
    if caller.has_role(UserRole::AppAdmin) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {} is not an administrator",
            caller.id
        )))
    }
}

/// Back-office views: web users and administrators.
pub fn require_web_access(caller: &Caller) -> Result<(), AppError> {
    if caller.has_role(UserRole::WebAccess) || caller.has_role(UserRole::AppAdmin) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {} has no web access",
            caller.id
        )))
    }
}
