use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::api::rest::auth::{require_admin, require_web_access};
use crate::api::rest::with_status;
use crate::engine::documents;
use crate::engine::tracking::{track_document, tracking_link};
use crate::error::AppError;
use crate::external::SourceDocument;
use crate::models::document::{
    DeliveryStatus, DispatchQueue, DocOutcome, DocTripInfo, MarkDeliveryFailedRequest,
    MarkDeliveryRequest, PurgeSummary, ScanOutcome, UndoOutcome,
};
use crate::models::tracking::{AccessInfo, TrackingLink, TrackingView};
use crate::models::user::Caller;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/docs/:doc_id/scan", post(scan_doc))
        .route("/docs/undo-all-scans", post(undo_all_scans))
        .route("/docs/dispatch-queue", get(dispatch_queue))
        .route("/docs/:doc_id/delivery", put(mark_delivery))
        .route("/docs/:doc_id/delivery-failed", put(mark_delivery_failed))
        .route("/docs/:doc_id/trip", get(doc_trip_info))
        .route("/docs/:doc_id/delivery-status", get(delivery_status))
        .route("/docs/tracking", get(track))
        .route("/tracking-link", get(tracking_link_for_erp))
        .route(
            "/docs/mock",
            get(list_mock_docs)
                .post(add_mock_docs)
                .delete(purge_mock_data),
        )
}

async fn scan_doc(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(doc_id): Path<String>,
) -> (StatusCode, Json<ScanOutcome>) {
    let outcome = documents::scan_and_add(&state, &doc_id, &caller).await;
    with_status(outcome.status_code, outcome)
}

async fn undo_all_scans(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> (StatusCode, Json<UndoOutcome>) {
    let outcome = documents::undo_all_scans(&state, &caller);
    with_status(outcome.status_code, outcome)
}

async fn dispatch_queue(State(state): State<Arc<AppState>>, caller: Caller) -> Json<DispatchQueue> {
    Json(documents::dispatch_queue(&state, &caller))
}

async fn mark_delivery(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(doc_id): Path<String>,
    Json(payload): Json<MarkDeliveryRequest>,
) -> Result<(StatusCode, Json<DocOutcome>), AppError> {
    let outcome = documents::mark_delivery(&state, &doc_id, payload, &caller)?;
    Ok(with_status(outcome.status_code, outcome))
}

async fn mark_delivery_failed(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(doc_id): Path<String>,
    Json(payload): Json<MarkDeliveryFailedRequest>,
) -> Result<(StatusCode, Json<DocOutcome>), AppError> {
    let outcome = documents::mark_delivery_failed(&state, &doc_id, payload, &caller)?;
    Ok(with_status(outcome.status_code, outcome))
}

async fn doc_trip_info(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(doc_id): Path<String>,
) -> Result<Json<DocTripInfo>, AppError> {
    Ok(Json(documents::doc_trip_info(&state, &doc_id)?))
}

async fn delivery_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(doc_id): Path<String>,
) -> Result<Json<DeliveryStatus>, AppError> {
    require_web_access(&caller)?;
    Ok(Json(documents::delivery_status(&state, &doc_id)?))
}

#[derive(Deserialize)]
pub struct TrackingQuery {
    pub token: String,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Public lookup; the token is the only credential.
async fn track(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TrackingQuery>,
) -> Result<Json<TrackingView>, AppError> {
    let ip_address = header(&headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next().map(|ip| ip.trim().to_string()))
        .or_else(|| header(&headers, "x-real-ip"));
    let access = AccessInfo {
        ip_address,
        user_agent: header(&headers, "user-agent"),
    };

    Ok(Json(track_document(&state, &query.token, access).await?))
}

#[derive(Deserialize)]
pub struct TrackingLinkQuery {
    #[serde(default)]
    pub doc_id: String,
}

/// Called by the ERP without a user identity.
async fn tracking_link_for_erp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TrackingLinkQuery>,
) -> Result<Json<TrackingLink>, AppError> {
    let host = header(&headers, "x-forwarded-host").or_else(|| header(&headers, "host"));
    Ok(Json(tracking_link(&state, &query.doc_id, host.as_deref())?))
}

async fn list_mock_docs(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<Vec<SourceDocument>>, AppError> {
    require_admin(&caller)?;
    Ok(Json(documents::mock_documents(&state)))
}

#[derive(Serialize)]
pub struct MockDocsAdded {
    pub total: usize,
}

async fn add_mock_docs(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<Vec<SourceDocument>>,
) -> Result<(StatusCode, Json<MockDocsAdded>), AppError> {
    require_admin(&caller)?;
    let total = documents::add_mock_documents(&state, payload)?;
    Ok((StatusCode::CREATED, Json(MockDocsAdded { total })))
}

async fn purge_mock_data(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<PurgeSummary>, AppError> {
    require_admin(&caller)?;
    Ok(Json(documents::purge_mock_data(&state)?))
}
