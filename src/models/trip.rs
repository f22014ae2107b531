use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::document::DocStatus;
use crate::models::location::GeoPoint;

/// Heading used for documents without a lot.
pub const DIRECT_DELIVERIES_HEADING: &str = "Direct Deliveries";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Scheduled,
    Started,
    Ended,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "SCHEDULED",
            TripStatus::Started => "STARTED",
            TripStatus::Ended => "ENDED",
            TripStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: i64,
    pub created_by: String,
    pub driven_by: String,
    pub vehicle_nbr: String,
    pub route: String,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTripRequest {
    pub route: String,
    pub user_ids: Vec<String>,
    pub driver_id: String,
    pub vehicle_nbr: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TripOutcome {
    pub success: bool,
    pub message: String,
    pub trip_id: i64,
    pub documents_affected: usize,
    #[serde(skip)]
    pub status_code: u16,
}

impl TripOutcome {
    pub fn ok(trip_id: i64, documents_affected: usize, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            trip_id,
            documents_affected,
            status_code: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableDriver {
    pub user_id: String,
    pub driver_name: String,
    pub vehicle_number: Option<String>,
    pub base_location_name: String,
    pub same_location: bool,
    pub is_self: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverList {
    pub success: bool,
    pub message: String,
    pub drivers: Vec<AvailableDriver>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverLocation {
    pub location: GeoPoint,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripSummary {
    pub trip_id: i64,
    pub created_by: String,
    pub created_by_id: String,
    pub driver_name: String,
    pub driver_id: String,
    pub driver_phone_number: String,
    pub vehicle_number: String,
    pub status: TripStatus,
    pub route: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_updated_at: DateTime<Utc>,
    pub creator_location: String,
    pub driver_location: String,
    pub driver_last_known_location: Option<DriverLocation>,
    pub pending_direct_deliveries: usize,
    pub total_direct_deliveries: usize,
    pub delivery_count_status_msg: String,
    pub pending_lot_drop_offs: usize,
    pub drop_off_count_status_msg: String,
}

/// A document as shown on a driver's run sheet.
#[derive(Debug, Clone, Serialize)]
pub struct RunSheetDoc {
    pub id: String,
    pub status: DocStatus,
    pub last_scanned_by: String,
    pub origin_warehouse: Option<String>,
    pub trip_id: Option<i64>,
    pub doc_date: DateTime<Utc>,
    pub doc_amount: Decimal,
    pub route: String,
    pub lot: Option<String>,
    pub comment: Option<String>,
    pub customer_id: String,
    pub transit_hub: Option<GeoPoint>,
    pub customer_firm_name: String,
    pub customer_address: String,
    pub customer_city: String,
    pub customer_pincode: String,
    pub customer_phone: String,
    pub customer_location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocGroup {
    pub heading: String,
    pub droppable: bool,
    pub drop_off_completed: bool,
    pub show_drop_off_button: bool,
    pub expand_by_default: bool,
    pub docs: Vec<RunSheetDoc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripDetails {
    #[serde(flatten)]
    pub summary: TripSummary,
    pub doc_groups: Vec<DocGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripList {
    pub success: bool,
    pub message: String,
    pub trips: Vec<TripSummary>,
    pub total_trips: usize,
}
