use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::engine::location;
use crate::error::AppError;
use crate::models::location::{RegisterLocationRequest, RegisteredLocation, UserLocations};
use crate::models::user::Caller;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/locations", post(register_location))
        .route("/locations/:user_id", get(user_locations))
}

async fn register_location(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<RegisterLocationRequest>,
) -> Result<Json<RegisteredLocation>, AppError> {
    Ok(Json(location::register_location(&state, &caller, payload)?))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    /// Epoch milliseconds.
    pub start: Option<i64>,
}

async fn user_locations(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<UserLocations>, AppError> {
    Ok(Json(location::user_locations(&state, &user_id, query.start)?))
}
