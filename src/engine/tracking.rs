use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use reqwest::Url;
use tracing::warn;

use crate::error::AppError;
use crate::external::notify::observed;
use crate::geo::haversine_km;
use crate::models::document::{DocStatus, Document, TrackingAccess};
use crate::models::location::GeoPoint;
use crate::models::tracking::{AccessInfo, TrackingLink, TrackingView};
use crate::models::trip::{DriverLocation, Trip, TripStatus};
use crate::state::AppState;

/// Minutes a driver spends at each customer stop.
pub const SERVICE_MINUTES_PER_STOP: i64 = 10;

/// Path of the customer facing tracking page.
pub const TRACKING_PAGE_PATH: &str = "/track";

/// Stand-in origin used to encode links when the public host is unknown.
const PLACEHOLDER_ORIGIN: &str = "https://tracking.invalid";

pub fn encode_token(doc_id: &str) -> String {
    STANDARD.encode(doc_id.as_bytes())
}

pub fn decode_token(token: &str) -> Option<String> {
    let bytes = STANDARD.decode(token.trim()).ok()?;
    String::from_utf8(bytes).ok().filter(|id| !id.is_empty())
}

/// Everything a lookup needs, read in one pass.
struct Snapshot {
    doc: Document,
    customer_location: Option<GeoPoint>,
    delivered_at: Option<chrono::DateTime<Utc>>,
    trip: Option<Trip>,
    /// Customers of the other documents still on the same trip.
    fellow_stops: Vec<(String, Option<GeoPoint>)>,
}

pub async fn track_document(
    state: &AppState,
    token: &str,
    access: AccessInfo,
) -> Result<TrackingView, AppError> {
    state.metrics.tracking_requests_total.inc();

    let invalid = || AppError::BadRequest("Invalid token".to_string());
    let doc_id = decode_token(token).ok_or_else(invalid)?;
    let snapshot = state
        .store
        .read(|t| {
            let doc = t.document(&doc_id)?.clone();
            let customer_location = t.customer(&doc.customer_id).and_then(|c| c.geo);
            let delivered_at = t.signature(&doc.id).map(|s| s.last_updated_at);
            let trip = doc.trip_id.and_then(|id| t.trip(id)).cloned();
            let fellow_stops = match doc.trip_id {
                Some(trip_id) => t
                    .documents_on_trip(trip_id)
                    .filter(|d| d.id != doc.id && d.status == DocStatus::OnTrip)
                    .map(|d| {
                        let geo = t.customer(&d.customer_id).and_then(|c| c.geo);
                        (d.customer_id.clone(), geo)
                    })
                    .collect(),
                None => Vec::new(),
            };
            Some(Snapshot {
                doc,
                customer_location,
                delivered_at,
                trip,
                fellow_stops,
            })
        })
        .ok_or_else(invalid)?;

    let accessed = TrackingAccess {
        doc_id: snapshot.doc.id.clone(),
        customer_id: snapshot.doc.customer_id.clone(),
        accessed_at: Utc::now(),
        ip_address: access.ip_address,
        user_agent: access.user_agent,
    };
    if let Err(err) = state.store.record_tracking_access(accessed) {
        warn!(doc_id = %snapshot.doc.id, error = %err, "failed to record tracking access");
    }

    let doc = &snapshot.doc;
    let mut view = TrackingView::new(&doc.id, doc.status);
    match doc.status {
        DocStatus::ReadyForDispatch | DocStatus::TripScheduled => {
            view.customer_location = snapshot.customer_location;
        }
        DocStatus::AtTransitHub => {
            view.customer_location = snapshot.customer_location;
            view.handler_location = doc.transit_hub;
        }
        DocStatus::OnTrip => {
            view.customer_location = snapshot.customer_location;
            add_driver_progress(state, &snapshot, &mut view).await;
        }
        DocStatus::Delivered => {
            view.comment = doc.comment.clone();
            view.delivery_timestamp = snapshot.delivered_at;
        }
        DocStatus::Undelivered => {
            view.comment = doc.comment.clone();
        }
    }
    Ok(view)
}

async fn add_driver_progress(state: &AppState, snapshot: &Snapshot, view: &mut TrackingView) {
    let Some(trip) = &snapshot.trip else { return };
    let (TripStatus::Started, Some(started_at)) = (trip.status, trip.started_at) else {
        return;
    };
    let Some(heartbeat) = state.store.latest_heartbeat(&trip.driven_by, Some(started_at)) else {
        return;
    };

    let driver = heartbeat.location;
    view.driver_last_known_location = Some(DriverLocation {
        location: driver,
        received_at: heartbeat.received_at,
    });

    let enroute = snapshot.customer_location.map_or(0, |customer| {
        count_enroute_customers(
            &driver,
            &customer,
            &snapshot.doc.customer_id,
            &snapshot.fellow_stops,
        )
    });
    view.num_enroute_customers = Some(enroute);
    view.enroute_customers_service_time = Some(enroute as i64 * SERVICE_MINUTES_PER_STOP);

    view.eta = Some(match snapshot.customer_location {
        Some(customer) => {
            let call = state.collaborators.eta.estimate(driver, customer);
            match observed(&state.metrics, "eta", state.outbound_timeout, call).await {
                Ok(Some(minutes)) => minutes,
                Ok(None) => -1,
                Err(err) => {
                    warn!(doc_id = %snapshot.doc.id, error = %err, "eta lookup failed");
                    -1
                }
            }
        }
        None => -1,
    });
}

/// Tracking page URL for `token`, absolute when the public host is known.
pub fn tracking_url(host: Option<&str>, token: &str) -> Result<String, AppError> {
    let host = host.map(str::trim).filter(|h| !h.is_empty());
    let origin = match host {
        Some(h) if h.starts_with("https://") || h.starts_with("http://") => h.to_string(),
        Some(h) => format!("https://{h}"),
        None => PLACEHOLDER_ORIGIN.to_string(),
    };
    let mut url = Url::parse(&origin)
        .map_err(|_| AppError::BadRequest(format!("'{origin}' is not a usable host")))?;
    url.set_path(TRACKING_PAGE_PATH);
    url.query_pairs_mut().append_pair("t", token);

    match host {
        Some(_) => Ok(url.into()),
        None => Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default())),
    }
}

/// Tracking link the ERP hands to customers once a document has left on a trip.
pub fn tracking_link(
    state: &AppState,
    doc_id: &str,
    host: Option<&str>,
) -> Result<TrackingLink, AppError> {
    let doc_id = doc_id.trim();
    if doc_id.is_empty() {
        return Err(AppError::BadRequest("doc_id query parameter is required".to_string()));
    }

    let status = state
        .store
        .read(|t| t.document(doc_id).map(|d| d.status))
        .ok_or_else(|| {
            AppError::BadRequest(
                "The provided doc_id is not among scanned documents in Pharma Tracker.".to_string(),
            )
        })?;
    if matches!(status, DocStatus::ReadyForDispatch | DocStatus::TripScheduled) {
        return Err(AppError::BadRequest(
            "The provided doc_id was scanned in Pharma Tracker, but not on a trip yet.".to_string(),
        ));
    }

    Ok(TrackingLink {
        status,
        tracking_url: tracking_url(host, &encode_token(doc_id))?,
        doc_id: doc_id.to_string(),
    })
}

/// Distinct other customers strictly closer to the driver than this one.
pub fn count_enroute_customers(
    driver: &GeoPoint,
    customer: &GeoPoint,
    customer_id: &str,
    stops: &[(String, Option<GeoPoint>)],
) -> usize {
    let own_distance = haversine_km(driver, customer);
    stops
        .iter()
        .filter(|(id, _)| id != customer_id)
        .filter_map(|(id, geo)| geo.map(|g| (id, g)))
        .filter(|(_, geo)| haversine_km(driver, geo) < own_distance)
        .map(|(id, _)| id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips() {
        let token = encode_token("INV/2024/0042");
        assert_eq!(token, "SU5WLzIwMjQvMDA0Mg==");
        assert_eq!(decode_token(&token).as_deref(), Some("INV/2024/0042"));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(decode_token("%%%not-base64").is_none());
        assert!(decode_token("").is_none());
    }

    #[test]
    fn tracking_url_encodes_token() {
        let url = tracking_url(Some("pharma.example.com"), "SU5WLzE=").unwrap();
        assert_eq!(url, "https://pharma.example.com/track?t=SU5WLzE%3D");

        let url = tracking_url(Some("https://pharma.example.com/"), "SU5WLzE=").unwrap();
        assert_eq!(url, "https://pharma.example.com/track?t=SU5WLzE%3D");
    }

    #[test]
    fn tracking_url_without_host_is_relative() {
        assert_eq!(tracking_url(None, "RDE=").unwrap(), "/track?t=RDE%3D");
        assert_eq!(tracking_url(Some("  "), "RDE=").unwrap(), "/track?t=RDE%3D");
    }

    #[test]
    fn counts_distinct_closer_customers() {
        let driver = GeoPoint { lat: 0.0, lng: 0.0 };
        let customer = GeoPoint { lat: 0.0, lng: 0.3 };
        let stops = vec![
            ("A".to_string(), Some(GeoPoint { lat: 0.0, lng: 0.1 })),
            ("A".to_string(), Some(GeoPoint { lat: 0.0, lng: 0.1 })),
            ("B".to_string(), Some(GeoPoint { lat: 0.0, lng: 0.2 })),
            ("C".to_string(), Some(GeoPoint { lat: 0.0, lng: 0.5 })),
            ("D".to_string(), None),
            ("ME".to_string(), Some(GeoPoint { lat: 0.0, lng: 0.05 })),
        ];

        assert_eq!(count_enroute_customers(&driver, &customer, "ME", &stops), 2);
    }
}
