use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::document::DocStatus;
use crate::models::trip::TripStatus;

/// Filters of the delivery report. Blank values are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryReportQuery {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub customer_id: Option<String>,
    /// Matches any document id containing this text.
    pub doc_id: Option<String>,
    /// Comma separated list of cities.
    pub customer_city: Option<String>,
    pub route: Option<String>,
    pub trip_id: Option<i64>,
    pub driver_user_id: Option<String>,
    pub origin_warehouse: Option<String>,
    /// Base location id of the trip creator.
    pub trip_start_location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReportRow {
    pub doc_id: String,
    pub status: DocStatus,
    pub origin_warehouse: String,
    pub doc_date: DateTime<Utc>,
    pub trip_id: i64,
    pub comment: String,
    pub customer_id: String,
    pub last_updated_at: DateTime<Utc>,
    pub firm_name: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub created_by: String,
    pub created_by_person_name: String,
    pub created_by_location: String,
    pub driven_by: String,
    pub driver_name: String,
    pub vehicle_nbr: String,
    pub route: String,
    pub trip_status: TripStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub success: bool,
    pub message: String,
    pub data: Vec<DeliveryReportRow>,
    pub total_records: usize,
}
