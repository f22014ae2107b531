use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocStatus {
    ReadyForDispatch,
    TripScheduled,
    OnTrip,
    AtTransitHub,
    Delivered,
    Undelivered,
}

impl DocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::ReadyForDispatch => "READY_FOR_DISPATCH",
            DocStatus::TripScheduled => "TRIP_SCHEDULED",
            DocStatus::OnTrip => "ON_TRIP",
            DocStatus::AtTransitHub => "AT_TRANSIT_HUB",
            DocStatus::Delivered => "DELIVERED",
            DocStatus::Undelivered => "UNDELIVERED",
        }
    }

    /// Statuses that require an attached trip.
    pub fn is_trip_bound(&self) -> bool {
        matches!(self, DocStatus::TripScheduled | DocStatus::OnTrip)
    }
}

impl fmt::Display for DocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub status: DocStatus,
    pub last_scanned_by: String,
    pub origin_warehouse: Option<String>,
    pub trip_id: Option<i64>,
    pub last_trip_id: Option<i64>,
    pub doc_date: DateTime<Utc>,
    pub doc_amount: Decimal,
    pub route: String,
    pub lot: Option<String>,
    pub comment: Option<String>,
    pub customer_id: String,
    pub transit_hub: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl Document {
    /// Moves the document to `status`, keeping `trip_id` consistent with it.
    ///
    /// Trip-bound statuses require `trip`. Terminal and hub statuses detach the
    /// document while `last_trip_id` keeps pointing at the trip that carried it.
    /// READY_FOR_DISPATCH releases the document from that trip entirely, so it
    /// no longer shows on the trip's run sheet.
    pub fn transition(&mut self, status: DocStatus, trip: Option<i64>, at: DateTime<Utc>) {
        self.status = status;
        if status.is_trip_bound() {
            self.trip_id = trip;
            if trip.is_some() {
                self.last_trip_id = trip;
            }
        } else {
            self.trip_id = None;
            if status == DocStatus::ReadyForDispatch {
                self.last_trip_id = None;
            }
        }
        self.last_updated_at = at;
    }
}

/// Proof of delivery. The image bytes are shared by every copy of the row.
#[derive(Debug, Clone)]
pub struct Signature {
    pub doc_id: String,
    pub signature: Arc<[u8]>,
    pub last_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingAccess {
    pub doc_id: String,
    pub customer_id: String,
    pub accessed_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Outcome of a scan. Field devices read `success`/`message`; the REST layer
/// maps `status_code` onto the HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanOutcome {
    pub success: bool,
    pub message: String,
    pub doc_id: String,
    #[serde(skip)]
    pub status_code: u16,
}

impl ScanOutcome {
    pub fn ok(doc_id: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            doc_id: doc_id.to_string(),
            status_code: 200,
        }
    }

    pub fn rejected(doc_id: &str, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            doc_id: doc_id.to_string(),
            status_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocOutcome {
    pub success: bool,
    pub message: String,
    pub doc_id: String,
    #[serde(skip)]
    pub status_code: u16,
}

impl DocOutcome {
    pub fn ok(doc_id: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            doc_id: doc_id.to_string(),
            status_code: 200,
        }
    }

    pub fn failed(doc_id: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            doc_id: doc_id.to_string(),
            status_code: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UndoOutcome {
    pub success: bool,
    pub message: String,
    pub deleted_docs: usize,
    #[serde(skip)]
    pub status_code: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkDeliveryRequest {
    /// Base64 encoded signature image.
    pub signature: Option<String>,
    pub delivery_comment: Option<String>,
    pub delivery_latitude: Option<f64>,
    pub delivery_longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkDeliveryFailedRequest {
    pub failure_comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScannedUserSummary {
    pub scanned_by_user_id: String,
    pub scanned_by_name: String,
    pub scanned_from_location: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub route: String,
    pub user_summaries: Vec<ScannedUserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchQueue {
    pub success: bool,
    pub message: String,
    pub routes: Vec<RouteSummary>,
    pub total_docs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeSummary {
    pub deleted_docs: usize,
    pub deleted_customers: usize,
}

/// Delivery state of a document with its proof of delivery, if any.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStatus {
    pub success: bool,
    pub message: String,
    pub doc_id: String,
    /// The id or tracking token the lookup was made with.
    pub requested_doc_id: String,
    pub status: DocStatus,
    pub comment: Option<String>,
    /// Base64 encoded signature image.
    pub signature: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocTripInfo {
    pub doc_id: String,
    pub doc_status: DocStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_status: Option<crate::models::trip::TripStatus>,
}
