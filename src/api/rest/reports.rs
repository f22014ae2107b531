use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::api::rest::auth::require_web_access;
use crate::engine::report;
use crate::error::AppError;
use crate::models::report::{DeliveryReport, DeliveryReportQuery};
use crate::models::user::Caller;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/reports/delivery", get(delivery_report))
}

async fn delivery_report(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<DeliveryReportQuery>,
) -> Result<Json<DeliveryReport>, AppError> {
    require_web_access(&caller)?;
    Ok(Json(report::delivery_report(&state, &query)?))
}
