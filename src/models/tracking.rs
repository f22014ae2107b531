use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::document::DocStatus;
use crate::models::location::GeoPoint;
use crate::models::trip::DriverLocation;

/// Request metadata recorded for every tracking lookup.
#[derive(Debug, Clone, Default)]
pub struct AccessInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub success: bool,
    pub message: String,
    pub doc_id: String,
    pub status: DocStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_location: Option<GeoPoint>,
    /// Where a dropped lot was left; a snapshot, so no timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_last_known_location: Option<DriverLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_enroute_customers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enroute_customers_service_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<i64>,
}

impl TrackingView {
    pub fn new(doc_id: &str, status: DocStatus) -> Self {
        Self {
            success: true,
            message: "Document tracking information retrieved successfully".to_string(),
            doc_id: doc_id.to_string(),
            status,
            comment: None,
            delivery_timestamp: None,
            customer_location: None,
            handler_location: None,
            driver_last_known_location: None,
            num_enroute_customers: None,
            enroute_customers_service_time: None,
            eta: None,
        }
    }
}

/// Customer facing tracking page of a document that left the warehouse.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingLink {
    pub status: DocStatus,
    pub tracking_url: String,
    pub doc_id: String,
}
