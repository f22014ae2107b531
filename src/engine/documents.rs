use std::collections::{BTreeMap, HashSet};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::error::AppError;
use crate::external::notify::observed;
use crate::external::SourceDocument;
use crate::engine::tracking::decode_token;
use crate::models::document::{
    DeliveryStatus, DispatchQueue, DocOutcome, DocStatus, DocTripInfo, Document,
    MarkDeliveryFailedRequest, MarkDeliveryRequest, PurgeSummary, RouteSummary, ScanOutcome,
    ScannedUserSummary, UndoOutcome,
};
use crate::models::event::EntityKind;
use crate::models::location::GeoPoint;
use crate::models::user::Caller;
use crate::state::AppState;
use crate::store::{StoreError, Tables};

/// Customer ids of generated test documents start with this.
pub const MOCK_CUSTOMER_PREFIX: &str = "MOCKCUST";

/// Scans a document into the dispatch queue. Never fails: every result,
/// including storage errors, is reported through the outcome.
pub async fn scan_and_add(state: &AppState, doc_id: &str, caller: &Caller) -> ScanOutcome {
    let doc_id = doc_id.trim();
    let outcome = if doc_id.is_empty() {
        ScanOutcome::rejected(doc_id, 400, "Doc ID is required")
    } else {
        scan(state, doc_id, caller).await
    };

    let label = match outcome.status_code {
        200 => "accepted",
        409 => "conflict",
        500 => "error",
        _ => "rejected",
    };
    state.metrics.scans_total.with_label_values(&[label]).inc();

    if outcome.success {
        info!(doc_id, user_id = %caller.id, "document scanned");
    } else {
        info!(
            doc_id,
            user_id = %caller.id,
            status_code = outcome.status_code,
            reason = %outcome.message,
            "scan rejected"
        );
    }
    outcome
}

async fn scan(state: &AppState, doc_id: &str, caller: &Caller) -> ScanOutcome {
    let known = state.store.read(|t| t.document(doc_id).is_some());
    if known {
        let now = Utc::now();
        return state
            .store
            .transaction(|t| rescan(t, doc_id, caller, now))
            .unwrap_or_else(|err| {
                ScanOutcome::rejected(doc_id, 500, format!("Error updating document: {err}"))
            });
    }

    let Some(source) = resolve_source(state, doc_id, &caller.id).await else {
        return ScanOutcome::rejected(doc_id, 400, "Doc ID not found in ERP");
    };

    let cool_off = state.settings.cool_off_seconds();
    let now = Utc::now();
    let result = state.store.transaction(|t| {
        // Another request may have added it while the source was queried.
        if t.document(doc_id).is_some() {
            return rescan(t, doc_id, caller, now);
        }
        if let Some(message) = route_conflict(t, &caller.id, &source.route_id, cool_off, now) {
            return Ok(ScanOutcome::rejected(doc_id, 400, message));
        }

        t.upsert_customer(source.customer_details(), now);
        t.insert_document(new_document(doc_id, &source, &caller.id, now))?;
        Ok(ScanOutcome::ok(doc_id, "Scanned and added to Dispatch Queue"))
    });

    match result {
        Ok(outcome) => {
            if outcome.success {
                state.publish(
                    EntityKind::Document,
                    doc_id,
                    DocStatus::ReadyForDispatch.as_str(),
                    &caller.id,
                );
            }
            outcome
        }
        Err(err) => ScanOutcome::rejected(doc_id, 500, format!("Error adding document: {err}")),
    }
}

/// Handles a scan of a document that is already stored.
fn rescan(
    t: &mut Tables,
    doc_id: &str,
    caller: &Caller,
    now: DateTime<Utc>,
) -> Result<ScanOutcome, StoreError> {
    let Some(status) = t.document(doc_id).map(|d| d.status) else {
        return Err(StoreError::MissingRow {
            table: "doc",
            key: doc_id.to_string(),
        });
    };

    let message = match status {
        DocStatus::Delivered => {
            return Ok(ScanOutcome::rejected(
                doc_id,
                400,
                "Doc ID is already delivered and cannot be scanned again",
            ));
        }
        DocStatus::TripScheduled => {
            return Ok(ScanOutcome::rejected(
                doc_id,
                409,
                "Doc ID is already scheduled for a trip",
            ));
        }
        DocStatus::OnTrip => {
            return Ok(ScanOutcome::rejected(doc_id, 409, "Doc ID is already out on a trip"));
        }
        DocStatus::ReadyForDispatch => "Doc ID re-scanned. Was already in dispatch queue",
        DocStatus::Undelivered => {
            "Scanned and added to Dispatch Queue (previous delivery attempt failed)"
        }
        DocStatus::AtTransitHub => "Scanned from transit hub and added to Dispatch Queue",
    };

    t.update_document(doc_id, |d| {
        d.last_scanned_by = caller.id.clone();
        d.transit_hub = None;
        d.transition(DocStatus::ReadyForDispatch, None, now);
    })?;
    Ok(ScanOutcome::ok(doc_id, message))
}

/// A message when the caller scanned a different route within the cool-off window.
fn route_conflict(
    t: &Tables,
    user_id: &str,
    route: &str,
    cool_off_secs: i64,
    now: DateTime<Utc>,
) -> Option<String> {
    let window_start = now - Duration::seconds(cool_off_secs);
    let last = t
        .documents()
        .filter(|d| d.last_scanned_by == user_id && d.last_updated_at > window_start)
        .max_by_key(|d| d.last_updated_at)?;

    if last.route == route {
        return None;
    }

    let elapsed = (now - last.last_updated_at).num_seconds();
    let remaining = (cool_off_secs - elapsed).max(1);
    Some(format!(
        "Route conflict detected. Previous scan route: {}. Current scan route: {}. \
         Please wait for {} second(s) cooling off period and then reattempt scan.",
        last.route, route, remaining
    ))
}

async fn resolve_source(state: &AppState, doc_id: &str, user_id: &str) -> Option<SourceDocument> {
    let lookup = state.collaborators.documents.resolve(doc_id, user_id);
    match observed(&state.metrics, "erp_document", state.outbound_timeout, lookup).await {
        Ok(Some(doc)) => return Some(doc),
        Ok(None) => {}
        Err(err) => {
            warn!(doc_id, error = %err, "erp lookup failed; trying mock documents");
        }
    }
    state.mock_docs.find(doc_id)
}

fn new_document(
    doc_id: &str,
    source: &SourceDocument,
    user_id: &str,
    now: DateTime<Utc>,
) -> Document {
    Document {
        id: doc_id.to_string(),
        status: DocStatus::ReadyForDispatch,
        last_scanned_by: user_id.to_string(),
        origin_warehouse: source.whse_location_name.clone(),
        trip_id: None,
        last_trip_id: None,
        doc_date: source.doc_date,
        doc_amount: source.doc_amount,
        route: source.route_id.clone(),
        lot: source.lot(),
        comment: None,
        customer_id: source.customer_id.clone(),
        transit_hub: None,
        created_at: now,
        last_updated_at: now,
    }
}

fn not_scanned() -> AppError {
    AppError::NotFound("Document was not scanned and so not in the system yet".to_string())
}

fn require_on_trip(doc: &Document, action: &str) -> Result<(), AppError> {
    if doc.status != DocStatus::OnTrip {
        return Err(AppError::BadRequest(format!(
            "Document {} is {}; only documents out on a trip can be {action}",
            doc.id, doc.status
        )));
    }
    Ok(())
}

fn checked_coordinate(value: Option<f64>, limit: f64, name: &str) -> Result<Option<f64>, AppError> {
    match value {
        Some(v) if !v.is_finite() || v.abs() > limit => Err(AppError::BadRequest(format!(
            "{name} must be between -{limit} and {limit}"
        ))),
        other => Ok(other),
    }
}

pub fn mark_delivery(
    state: &AppState,
    doc_id: &str,
    req: MarkDeliveryRequest,
    caller: &Caller,
) -> Result<DocOutcome, AppError> {
    if state.store.read(|t| t.document(doc_id).is_none()) {
        return Err(not_scanned());
    }

    let encoded = req
        .signature
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("Signature is required for successful delivery".to_string())
        })?;
    let signature = STANDARD
        .decode(encoded)
        .map_err(|_| AppError::BadRequest("Signature must be valid base64".to_string()))?;

    let lat = checked_coordinate(req.delivery_latitude, 90.0, "delivery_latitude")?;
    let lng = checked_coordinate(req.delivery_longitude, 180.0, "delivery_longitude")?;
    let delivered_at = match (lat, lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    };
    let comment = req.delivery_comment.filter(|c| !c.trim().is_empty());

    let now = Utc::now();
    let result = state.store.transaction(|t| {
        let doc = t.document(doc_id).cloned().ok_or_else(not_scanned)?;
        require_on_trip(&doc, "delivered")?;

        t.update_document(doc_id, |d| {
            d.transition(DocStatus::Delivered, None, now);
            if let Some(comment) = comment {
                d.comment = Some(comment);
            }
        })?;
        t.upsert_signature(doc_id, signature, now)?;
        if let Some(point) = delivered_at {
            t.set_customer_geo(&doc.customer_id, point, now)?;
        }
        Ok::<_, AppError>(())
    });

    match result {
        Ok(()) => {}
        Err(AppError::Internal(reason)) => {
            warn!(doc_id, error = %reason, "failed to record delivery");
            return Ok(DocOutcome::failed(doc_id, format!("Error marking delivery: {reason}")));
        }
        Err(err) => return Err(err),
    }

    info!(
        doc_id,
        user_id = %caller.id,
        with_location = delivered_at.is_some(),
        "document delivered"
    );
    after_doc_status_change(state, doc_id, DocStatus::Delivered, caller);
    Ok(DocOutcome::ok(doc_id, "Document marked as delivered successfully"))
}

pub fn mark_delivery_failed(
    state: &AppState,
    doc_id: &str,
    req: MarkDeliveryFailedRequest,
    caller: &Caller,
) -> Result<DocOutcome, AppError> {
    if state.store.read(|t| t.document(doc_id).is_none()) {
        return Err(not_scanned());
    }
    let comment = req.failure_comment.trim().to_string();
    if comment.is_empty() {
        return Err(AppError::BadRequest("Failure comment is required".to_string()));
    }

    let now = Utc::now();
    let result = state.store.transaction(|t| {
        let doc = t.document(doc_id).cloned().ok_or_else(not_scanned)?;
        require_on_trip(&doc, "marked undelivered")?;

        t.update_document(doc_id, |d| {
            d.transition(DocStatus::Undelivered, None, now);
            d.comment = Some(comment);
        })?;
        Ok::<_, AppError>(())
    });

    match result {
        Ok(()) => {}
        Err(AppError::Internal(reason)) => {
            warn!(doc_id, error = %reason, "failed to record failed delivery");
            return Ok(DocOutcome::failed(
                doc_id,
                format!("Error marking delivery failed: {reason}"),
            ));
        }
        Err(err) => return Err(err),
    }

    info!(doc_id, user_id = %caller.id, "delivery failed");
    after_doc_status_change(state, doc_id, DocStatus::Undelivered, caller);
    Ok(DocOutcome::ok(doc_id, "Document marked as delivery failed successfully"))
}

/// Post-commit side effects of a document status change.
pub(crate) fn after_doc_status_change(
    state: &AppState,
    doc_id: &str,
    status: DocStatus,
    caller: &Caller,
) {
    if state.settings.update_status_to_external_system() {
        state
            .notifier
            .status_changed(doc_id.to_string(), status, caller.id.clone());
    }
    state.publish(EntityKind::Document, doc_id, status.as_str(), &caller.id);
}

pub fn undo_all_scans(state: &AppState, caller: &Caller) -> UndoOutcome {
    let result = state.store.transaction(|t| {
        let ids: Vec<String> = t
            .documents()
            .filter(|d| d.last_scanned_by == caller.id && d.status == DocStatus::ReadyForDispatch)
            .map(|d| d.id.clone())
            .collect();
        for id in &ids {
            t.delete_document(id);
        }
        Ok::<_, StoreError>(ids.len())
    });

    match result {
        Ok(0) => UndoOutcome {
            success: true,
            message: "No documents found to undo".to_string(),
            deleted_docs: 0,
            status_code: 200,
        },
        Ok(deleted) => {
            info!(user_id = %caller.id, deleted, "scans undone");
            UndoOutcome {
                success: true,
                message: format!("Successfully unscanned {deleted} documents"),
                deleted_docs: deleted,
                status_code: 200,
            }
        }
        Err(err) => {
            warn!(user_id = %caller.id, error = %err, "undo scans failed");
            UndoOutcome {
                success: false,
                message: "Failed to undo scans".to_string(),
                deleted_docs: 0,
                status_code: 500,
            }
        }
    }
}

/// Ready documents scanned from the caller's base location, by route then scanner.
pub fn dispatch_queue(state: &AppState, caller: &Caller) -> DispatchQueue {
    state.store.read(|t| {
        let colleagues: HashSet<&str> = t
            .users()
            .filter(|u| u.base_location_id == caller.base_location_id)
            .map(|u| u.id.as_str())
            .collect();

        let mut routes: BTreeMap<&str, BTreeMap<&str, ScannedUserSummary>> = BTreeMap::new();
        let mut total = 0;
        for doc in t.documents().filter(|d| {
            d.status == DocStatus::ReadyForDispatch
                && colleagues.contains(d.last_scanned_by.as_str())
        }) {
            total += 1;
            routes
                .entry(doc.route.as_str())
                .or_default()
                .entry(doc.last_scanned_by.as_str())
                .or_insert_with(|| ScannedUserSummary {
                    scanned_by_user_id: doc.last_scanned_by.clone(),
                    scanned_by_name: t
                        .user(&doc.last_scanned_by)
                        .map(|u| u.person_name.clone())
                        .unwrap_or_default(),
                    scanned_from_location: caller.base_location_name.clone(),
                    count: 0,
                })
                .count += 1;
        }

        DispatchQueue {
            success: true,
            message: format!("Found {total} documents in dispatch queue for your base location"),
            routes: routes
                .into_iter()
                .map(|(route, users)| RouteSummary {
                    route: route.to_string(),
                    user_summaries: users.into_values().collect(),
                })
                .collect(),
            total_docs: total,
        }
    })
}

pub fn add_mock_documents(state: &AppState, docs: Vec<SourceDocument>) -> Result<usize, AppError> {
    if let Some(bad) = docs
        .iter()
        .find(|d| d.doc_id.trim().is_empty() || d.customer_id.trim().is_empty())
    {
        return Err(AppError::BadRequest(format!(
            "mock document '{}' needs a doc id and a customer id",
            bad.doc_id
        )));
    }
    let added = docs.len();
    let total = state.mock_docs.add(docs);
    info!(added, total, "mock documents added");
    Ok(total)
}

pub fn mock_documents(state: &AppState) -> Vec<SourceDocument> {
    state.mock_docs.list()
}

/// Removes stored documents and customers created from mock data.
pub fn purge_mock_data(state: &AppState) -> Result<PurgeSummary, AppError> {
    let summary = state.store.transaction(|t| {
        let doc_ids: Vec<String> = t
            .documents()
            .filter(|d| d.customer_id.starts_with(MOCK_CUSTOMER_PREFIX))
            .map(|d| d.id.clone())
            .collect();
        for id in &doc_ids {
            t.delete_document(id);
        }

        let customer_ids: Vec<String> = t
            .customers()
            .filter(|c| c.id.starts_with(MOCK_CUSTOMER_PREFIX))
            .map(|c| c.id.clone())
            .collect();
        for id in &customer_ids {
            t.delete_customer(id)?;
        }

        Ok::<_, StoreError>(PurgeSummary {
            deleted_docs: doc_ids.len(),
            deleted_customers: customer_ids.len(),
        })
    })?;

    state.mock_docs.clear();
    info!(
        deleted_docs = summary.deleted_docs,
        deleted_customers = summary.deleted_customers,
        "mock data purged"
    );
    Ok(summary)
}

pub fn doc_trip_info(state: &AppState, doc_id: &str) -> Result<DocTripInfo, AppError> {
    state.store.read(|t| {
        let doc = t.document(doc_id).ok_or_else(not_scanned)?;
        let trip_id = doc.trip_id.or(doc.last_trip_id);
        Ok(DocTripInfo {
            doc_id: doc.id.clone(),
            doc_status: doc.status,
            trip_id,
            trip_status: trip_id.and_then(|id| t.trip(id)).map(|trip| trip.status),
        })
    })
}

/// Delivery state and signature of a document, looked up by tracking token
/// or by plain document id.
pub fn delivery_status(state: &AppState, requested: &str) -> Result<DeliveryStatus, AppError> {
    state.store.read(|t| {
        let doc = decode_token(requested)
            .and_then(|id| t.document(&id))
            .or_else(|| t.document(requested.trim()))
            .ok_or_else(|| AppError::NotFound(format!("Document {requested} not found")))?;
        let signature = t.signature(&doc.id);

        Ok(DeliveryStatus {
            success: true,
            message: "Delivery status retrieved successfully".to_string(),
            doc_id: doc.id.clone(),
            requested_doc_id: requested.to_string(),
            status: doc.status,
            comment: doc.comment.clone(),
            signature: signature.map(|s| STANDARD.encode(&s.signature)),
            delivered_at: signature.map(|s| s.last_updated_at),
        })
    })
}
