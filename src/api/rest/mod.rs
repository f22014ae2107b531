pub mod auth;
pub mod directory;
pub mod documents;
pub mod locations;
pub mod reports;
pub mod settings;
pub mod trips;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(documents::router())
        .merge(trips::router())
        .merge(locations::router())
        .merge(reports::router())
        .merge(settings::router())
        .merge(directory::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Structured outcomes carry their own HTTP status for field devices.
pub(crate) fn with_status<T>(code: u16, body: T) -> (StatusCode, Json<T>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    documents: usize,
    trips: usize,
    users: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (documents, trips, users) = state.store.read(|t| {
        (t.documents().count(), t.trips().count(), t.users().count())
    });
    Json(HealthResponse {
        status: "ok",
        documents,
        trips,
        users,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
