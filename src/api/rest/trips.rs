use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;

use crate::api::rest::auth::require_web_access;
use crate::api::rest::with_status;
use crate::engine::trips;
use crate::error::AppError;
use crate::models::trip::{CreateTripRequest, DriverList, TripDetails, TripList, TripOutcome};
use crate::models::user::Caller;
use crate::state::AppState;

type OutcomeResponse = Result<(StatusCode, Json<TripOutcome>), AppError>;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trips", post(create_trip))
        .route("/trips/drivers", get(available_drivers))
        .route("/trips/mine", get(my_trips))
        .route("/trips/scheduled", get(scheduled_trips))
        .route("/trips/all", get(all_trips))
        .route("/trips/all/scheduled", get(all_scheduled_trips))
        .route("/trips/:id", get(trip_details))
        .route("/trips/:id/start", post(start_trip))
        .route("/trips/:id/end", post(end_trip))
        .route("/trips/:id/force-end", post(force_end_trip))
        .route("/trips/:id/cancel", post(cancel_trip))
        .route("/trips/:id/lots/:lot/drop-off", post(drop_off_lot))
}

fn respond(outcome: TripOutcome) -> (StatusCode, Json<TripOutcome>) {
    with_status(outcome.status_code, outcome)
}

async fn create_trip(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(payload): Json<CreateTripRequest>,
) -> OutcomeResponse {
    trips::create_trip(&state, payload, &caller).map(respond)
}

async fn available_drivers(State(state): State<Arc<AppState>>, caller: Caller) -> Json<DriverList> {
    Json(trips::available_drivers(&state, &caller))
}

async fn my_trips(State(state): State<Arc<AppState>>, caller: Caller) -> Json<TripList> {
    Json(trips::my_trips(&state, &caller))
}

async fn scheduled_trips(State(state): State<Arc<AppState>>, caller: Caller) -> Json<TripList> {
    Json(trips::scheduled_trips_for_location(&state, &caller))
}

async fn all_trips(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<TripList>, AppError> {
    require_web_access(&caller)?;
    Ok(Json(trips::all_trips(&state)))
}

async fn all_scheduled_trips(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<TripList>, AppError> {
    require_web_access(&caller)?;
    Ok(Json(trips::all_scheduled_trips(&state)))
}

async fn trip_details(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<TripDetails>, AppError> {
    Ok(Json(trips::trip_details(&state, id)?))
}

async fn start_trip(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> OutcomeResponse {
    trips::start_trip(&state, id, &caller).map(respond)
}

async fn end_trip(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> OutcomeResponse {
    trips::end_trip(&state, id, &caller).map(respond)
}

async fn force_end_trip(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> OutcomeResponse {
    trips::force_end_trip(&state, id, &caller).map(respond)
}

async fn cancel_trip(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> OutcomeResponse {
    trips::cancel_trip(&state, id, &caller).map(respond)
}

async fn drop_off_lot(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path((id, lot)): Path<(i64, String)>,
) -> OutcomeResponse {
    trips::drop_off_lot(&state, id, &lot, &caller).map(respond)
}
