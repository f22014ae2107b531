use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::location::{
    GeoPoint, LocationHeartbeat, RegisterLocationRequest, RegisteredLocation, UserLocations,
};
use crate::models::user::Caller;
use crate::state::AppState;

const DEFAULT_HISTORY_HOURS: i64 = 48;

pub fn register_location(
    state: &AppState,
    caller: &Caller,
    req: RegisterLocationRequest,
) -> Result<RegisteredLocation, AppError> {
    let location = GeoPoint::checked(req.latitude, req.longitude).ok_or_else(|| {
        AppError::BadRequest(
            "latitude must be within ±90 and longitude within ±180".to_string(),
        )
    })?;

    let heartbeat = LocationHeartbeat {
        id: Uuid::new_v4(),
        user_id: caller.id.clone(),
        location,
        received_at: Utc::now(),
    };
    let location_id = heartbeat.id;
    state.store.append_heartbeat(heartbeat);
    debug!(user_id = %caller.id, %location_id, "location registered");

    Ok(RegisteredLocation {
        success: true,
        message: "Location registered successfully".to_string(),
        location_id,
        minutes_between_heartbeats: state.settings.minutes_between_location_heartbeats(),
    })
}

/// Heartbeats of a user since `start_epoch_ms`, or the last 48 hours.
pub fn user_locations(
    state: &AppState,
    user_id: &str,
    start_epoch_ms: Option<i64>,
) -> Result<UserLocations, AppError> {
    let user_name = state
        .store
        .read(|t| t.user(user_id).map(|u| u.person_name.clone()))
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    let since = match start_epoch_ms {
        Some(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
            .filter(|at| (2000..=2100).contains(&at.year()))
            .ok_or_else(|| {
                AppError::BadRequest(format!("start time {ms} is not a valid epoch in milliseconds"))
            })?,
        None => Utc::now() - Duration::hours(DEFAULT_HISTORY_HOURS),
    };

    let locations = state.store.heartbeats_after(user_id, since);
    Ok(UserLocations {
        success: true,
        message: format!("Found {} location records", locations.len()),
        user_id: user_id.to_string(),
        user_name,
        total_count: locations.len(),
        locations,
    })
}
