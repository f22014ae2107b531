use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use axum::Router;

use crate::api::rest::auth::require_admin;
use crate::engine::directory;
use crate::error::AppError;
use crate::models::user::{AppUser, BaseLocation, Caller};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(upsert_user))
        .route("/base-locations", post(upsert_base_location))
}

async fn upsert_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<AppUser>,
) -> Result<(StatusCode, Json<AppUser>), AppError> {
    require_admin(&caller)?;
    Ok((StatusCode::CREATED, Json(directory::upsert_user(&state, payload)?)))
}

async fn upsert_base_location(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<BaseLocation>,
) -> Result<(StatusCode, Json<BaseLocation>), AppError> {
    require_admin(&caller)?;
    Ok((
        StatusCode::CREATED,
        Json(directory::upsert_base_location(&state, payload)?),
    ))
}
