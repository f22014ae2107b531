use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::Json;
use axum::Router;

use crate::api::rest::auth::require_admin;
use crate::error::AppError;
use crate::models::user::Caller;
use crate::settings::SettingValue;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/settings", put(update_setting))
        .route("/settings/:name", get(get_setting))
}

async fn get_setting(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(name): Path<String>,
) -> Result<Json<SettingValue>, AppError> {
    Ok(Json(state.settings.get_setting(&name)?))
}

async fn update_setting(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<SettingValue>,
) -> Result<Json<SettingValue>, AppError> {
    require_admin(&caller)?;
    let updated = state
        .settings
        .update_setting(&state.store, &payload.name, &payload.value)?;
    Ok(Json(updated))
}
