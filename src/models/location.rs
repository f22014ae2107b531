use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Builds a point only when both coordinates are present and in range.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationHeartbeat {
    pub id: Uuid,
    pub user_id: String,
    pub location: GeoPoint,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredLocation {
    pub success: bool,
    pub message: String,
    pub location_id: Uuid,
    pub minutes_between_heartbeats: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserLocations {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    pub user_name: String,
    pub locations: Vec<LocationHeartbeat>,
    pub total_count: usize,
}
