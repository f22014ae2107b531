use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::engine::documents::after_doc_status_change;
use crate::engine::tracking::encode_token;
use crate::error::AppError;
use crate::geo::sort_by_distance;
use crate::models::document::{DocStatus, Document};
use crate::models::event::EntityKind;
use crate::models::location::GeoPoint;
use crate::models::trip::{
    AvailableDriver, CreateTripRequest, DocGroup, DriverList, DriverLocation, RunSheetDoc, Trip,
    TripDetails, TripList, TripOutcome, TripStatus, TripSummary, DIRECT_DELIVERIES_HEADING,
};
use crate::models::user::{Caller, UserRole};
use crate::state::AppState;
use crate::store::{NewTrip, Tables};

/// Prefixes a failed transaction's message with the attempted action.
fn failed(action: &'static str) -> impl Fn(AppError) -> AppError {
    move |err| match err {
        AppError::Internal(reason) => AppError::Internal(format!("Failed to {action}: {reason}")),
        other => other,
    }
}

fn load_trip(t: &Tables, trip_id: i64) -> Result<Trip, AppError> {
    t.trip(trip_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Trip with ID '{trip_id}' not found.")))
}

fn require_status(trip: &Trip, expected: TripStatus, action: &str) -> Result<(), AppError> {
    if trip.status != expected {
        return Err(AppError::BadRequest(format!(
            "Only trips in {expected} status can {action}. Current status: {}",
            trip.status
        )));
    }
    Ok(())
}

fn require_driver(trip: &Trip, caller: &Caller, action: &str) -> Result<(), AppError> {
    if trip.driven_by != caller.id {
        return Err(AppError::BadRequest(format!(
            "Only the assigned driver can {action}. Assigned driver: {}, Your ID: {}",
            trip.driven_by, caller.id
        )));
    }
    Ok(())
}

fn attached_ids(t: &Tables, trip_id: i64) -> Vec<String> {
    t.documents_on_trip(trip_id).map(|d| d.id.clone()).collect()
}

fn announce_docs(state: &AppState, doc_ids: &[String], status: DocStatus, caller: &Caller) {
    for doc_id in doc_ids {
        after_doc_status_change(state, doc_id, status, caller);
    }
}

fn announce_trip(
    state: &AppState,
    trip_id: i64,
    status: TripStatus,
    transition: &str,
    caller: &Caller,
) {
    state
        .metrics
        .trip_transitions_total
        .with_label_values(&[transition])
        .inc();
    state.publish(EntityKind::Trip, trip_id, status.as_str(), &caller.id);
}

pub fn create_trip(
    state: &AppState,
    req: CreateTripRequest,
    caller: &Caller,
) -> Result<TripOutcome, AppError> {
    let route = req.route.trim().to_string();
    if route.is_empty() || req.user_ids.is_empty() {
        return Err(AppError::BadRequest(
            "A route and at least one scanning user are required.".to_string(),
        ));
    }

    let now = Utc::now();
    let (trip_id, doc_ids) = state
        .store
        .transaction(|t| {
            let doc_ids: Vec<String> = t
                .documents()
                .filter(|d| {
                    d.status == DocStatus::ReadyForDispatch
                        && d.route == route
                        && req.user_ids.contains(&d.last_scanned_by)
                })
                .map(|d| d.id.clone())
                .collect();
            if doc_ids.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "No documents found for the specified route '{route}' and user IDs in READY_FOR_DISPATCH status."
                )));
            }

            let driver = t.user(&req.driver_id).ok_or_else(|| {
                AppError::BadRequest(format!("Driver with ID '{}' not found.", req.driver_id))
            })?;
            if t.user(&caller.id).is_none() {
                return Err(AppError::BadRequest(format!(
                    "Creator with ID '{}' not found.",
                    caller.id
                )));
            }

            let vehicle_nbr = Some(req.vehicle_nbr.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| driver.vehicle_nbr.clone())
                .ok_or_else(|| AppError::BadRequest("A vehicle number is required.".to_string()))?;

            let trip_id = t.insert_trip(NewTrip {
                created_by: caller.id.clone(),
                driven_by: req.driver_id.clone(),
                vehicle_nbr,
                route: route.clone(),
                created_at: now,
            })?;
            for id in &doc_ids {
                t.update_document(id, |d| {
                    d.transition(DocStatus::TripScheduled, Some(trip_id), now)
                })?;
            }
            Ok((trip_id, doc_ids))
        })
        .map_err(failed("create trip"))?;

    info!(
        trip_id,
        route = %route,
        driver_id = %req.driver_id,
        docs = doc_ids.len(),
        "trip created"
    );
    announce_trip(state, trip_id, TripStatus::Scheduled, "created", caller);
    announce_docs(state, &doc_ids, DocStatus::TripScheduled, caller);

    let mut outcome = TripOutcome::ok(
        trip_id,
        doc_ids.len(),
        format!("Trip created successfully with {} documents loaded.", doc_ids.len()),
    );
    outcome.status_code = 201;
    Ok(outcome)
}

pub fn start_trip(
    state: &AppState,
    trip_id: i64,
    caller: &Caller,
) -> Result<TripOutcome, AppError> {
    let now = Utc::now();
    // (doc id, customer phone) for every document put on the road.
    let loaded = state
        .store
        .transaction(|t| {
            let trip = load_trip(t, trip_id)?;
            require_status(&trip, TripStatus::Scheduled, "be started")?;
            require_driver(&trip, caller, "start this trip")?;

            if let Some(other) = t
                .trips()
                .find(|o| {
                    o.driven_by == caller.id && o.status == TripStatus::Started && o.id != trip_id
                })
            {
                return Err(AppError::BadRequest(format!(
                    "Cannot start trip #{trip_id}. Another trip (#{}) is already ongoing for you. Please end that trip first.",
                    other.id
                )));
            }

            let doc_ids = attached_ids(t, trip_id);
            if doc_ids.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Trip #{trip_id} has no associated documents. A trip must have at least one document to be started."
                )));
            }

            t.update_trip(trip_id, |trip| {
                trip.status = TripStatus::Started;
                trip.started_at = Some(now);
                trip.last_updated_at = now;
            })?;
            let mut loaded = Vec::with_capacity(doc_ids.len());
            for id in doc_ids {
                t.update_document(&id, |d| d.transition(DocStatus::OnTrip, Some(trip_id), now))?;
                let phone = t
                    .document(&id)
                    .and_then(|d| t.customer(&d.customer_id))
                    .and_then(|c| c.phone.clone());
                loaded.push((id, phone));
            }
            Ok(loaded)
        })
        .map_err(failed("start trip"))?;

    info!(trip_id, driver_id = %caller.id, docs = loaded.len(), "trip started");
    let doc_ids: Vec<String> = loaded.iter().map(|(id, _)| id.clone()).collect();
    announce_trip(state, trip_id, TripStatus::Started, "started", caller);
    announce_docs(state, &doc_ids, DocStatus::OnTrip, caller);

    if state.settings.send_tracking_sms() {
        for (doc_id, customer_phone) in loaded {
            let recipient = if state.redirect_sms_to_caller {
                Some(caller.mobile.clone())
            } else {
                customer_phone
            };
            match recipient.filter(|p| !p.trim().is_empty()) {
                Some(phone) => {
                    let token = encode_token(&doc_id);
                    state.notifier.tracking_sms(phone, doc_id, token);
                }
                None => info!(doc_id = %doc_id, "no phone number; skipping tracking sms"),
            }
        }
    }

    Ok(TripOutcome::ok(
        trip_id,
        doc_ids.len(),
        format!(
            "Trip {trip_id} has been started successfully. {} document(s) are now ON_TRIP.",
            doc_ids.len()
        ),
    ))
}

pub fn drop_off_lot(
    state: &AppState,
    trip_id: i64,
    lot_heading: &str,
    caller: &Caller,
) -> Result<TripOutcome, AppError> {
    let hub = state
        .store
        .latest_heartbeat(&caller.id, None)
        .map(|hb| hb.location);
    let now = Utc::now();

    let dropped = state
        .store
        .transaction(|t| {
            let trip = load_trip(t, trip_id)?;
            require_status(&trip, TripStatus::Started, "drop off lots")?;
            require_driver(&trip, caller, "drop off lots for this trip")?;

            if lot_heading == DIRECT_DELIVERIES_HEADING {
                return Err(AppError::BadRequest(format!(
                    "Cannot drop off '{lot_heading}' group. Direct deliveries must be delivered individually."
                )));
            }

            let in_lot = |d: &Document| d.lot.as_deref() == Some(lot_heading);
            if !t.documents_of_trip(trip_id).any(in_lot) {
                return Err(AppError::BadRequest(format!(
                    "No documents found with lot heading '{lot_heading}' in trip {trip_id}."
                )));
            }

            let ids: Vec<String> = t
                .documents_on_trip(trip_id)
                .filter(|d| in_lot(*d) && d.status == DocStatus::OnTrip)
                .map(|d| d.id.clone())
                .collect();
            for id in &ids {
                t.update_document(id, |d| {
                    d.transition(DocStatus::AtTransitHub, None, now);
                    d.transit_hub = hub;
                })?;
            }
            Ok(ids)
        })
        .map_err(failed("drop off lot"))?;

    info!(
        trip_id,
        lot = lot_heading,
        docs = dropped.len(),
        has_location = hub.is_some(),
        "lot dropped off"
    );
    announce_docs(state, &dropped, DocStatus::AtTransitHub, caller);

    Ok(TripOutcome::ok(
        trip_id,
        dropped.len(),
        format!(
            "Successfully dropped off {} document(s) from lot '{lot_heading}' at transit hub.",
            dropped.len()
        ),
    ))
}

pub fn end_trip(state: &AppState, trip_id: i64, caller: &Caller) -> Result<TripOutcome, AppError> {
    let now = Utc::now();
    state
        .store
        .transaction(|t| {
            let trip = load_trip(t, trip_id)?;
            require_status(&trip, TripStatus::Started, "be ended")?;
            require_driver(&trip, caller, "end this trip")?;

            let (direct, lots): (Vec<&Document>, Vec<&Document>) =
                t.documents_on_trip(trip_id).partition(|d| d.lot.is_none());
            if !direct.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Cannot end trip. {} deliveries still pending. Please mark all direct delivery documents as delivered or failed delivery before ending the trip.",
                    direct.len()
                )));
            }
            if !lots.is_empty() {
                return Err(AppError::BadRequest(
                    "Cannot end trip. Some lots still need to be dropped off.".to_string(),
                ));
            }

            t.update_trip(trip_id, |trip| {
                trip.status = TripStatus::Ended;
                trip.last_updated_at = now;
            })?;
            Ok(())
        })
        .map_err(failed("end trip"))?;

    info!(trip_id, driver_id = %caller.id, "trip ended");
    announce_trip(state, trip_id, TripStatus::Ended, "ended", caller);
    Ok(TripOutcome::ok(
        trip_id,
        0,
        format!("Trip {trip_id} has been successfully ended."),
    ))
}

pub fn force_end_trip(
    state: &AppState,
    trip_id: i64,
    caller: &Caller,
) -> Result<TripOutcome, AppError> {
    if !caller.has_role(UserRole::AppAdmin) {
        return Err(AppError::Forbidden(
            "Only administrators can force end a trip.".to_string(),
        ));
    }

    let now = Utc::now();
    let comment = format!("Trip force ended by user {}", caller.username);
    let undelivered = state
        .store
        .transaction(|t| {
            let trip = load_trip(t, trip_id)?;
            require_status(&trip, TripStatus::Started, "be force ended")?;

            let ids = attached_ids(t, trip_id);
            for id in &ids {
                t.update_document(id, |d| {
                    d.transition(DocStatus::Undelivered, None, now);
                    d.comment = Some(comment.clone());
                })?;
            }
            t.update_trip(trip_id, |trip| {
                trip.status = TripStatus::Ended;
                trip.last_updated_at = now;
            })?;
            Ok::<_, AppError>(ids)
        })
        .map_err(failed("force end trip"))?;

    info!(trip_id, admin_id = %caller.id, undelivered = undelivered.len(), "trip force ended");
    announce_trip(state, trip_id, TripStatus::Ended, "force_ended", caller);
    announce_docs(state, &undelivered, DocStatus::Undelivered, caller);

    Ok(TripOutcome::ok(
        trip_id,
        undelivered.len(),
        format!(
            "Trip {trip_id} has been force ended successfully. {} document(s) marked as undelivered.",
            undelivered.len()
        ),
    ))
}

pub fn cancel_trip(
    state: &AppState,
    trip_id: i64,
    caller: &Caller,
) -> Result<TripOutcome, AppError> {
    let now = Utc::now();
    let released = state
        .store
        .transaction(|t| {
            let trip = load_trip(t, trip_id)?;
            require_status(&trip, TripStatus::Scheduled, "be cancelled")?;

            let creator_location = t.user(&trip.created_by).map(|u| u.base_location_id.clone());
            if creator_location.as_deref() != Some(caller.base_location_id.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "Only users from the same location as the trip creator can cancel this trip. \
                     Trip creator location: {}, Your location: {}",
                    t.user_location_name(&trip.created_by),
                    caller.base_location_name
                )));
            }

            let ids = attached_ids(t, trip_id);
            for id in &ids {
                t.update_document(id, |d| {
                    d.transition(DocStatus::ReadyForDispatch, None, now);
                    d.transit_hub = None;
                })?;
            }
            t.update_trip(trip_id, |trip| {
                trip.status = TripStatus::Cancelled;
                trip.last_updated_at = now;
            })?;
            Ok(ids)
        })
        .map_err(failed("cancel trip"))?;

    info!(trip_id, user_id = %caller.id, released = released.len(), "trip cancelled");
    announce_trip(state, trip_id, TripStatus::Cancelled, "cancelled", caller);
    announce_docs(state, &released, DocStatus::ReadyForDispatch, caller);

    Ok(TripOutcome::ok(
        trip_id,
        released.len(),
        format!(
            "Trip {trip_id} has been cancelled successfully. {} document(s) moved back to READY_FOR_DISPATCH status.",
            released.len()
        ),
    ))
}

/// Self first, then drivers from the caller's base location, then the rest.
fn rank_drivers(drivers: &mut [AvailableDriver]) {
    drivers.sort_by(|a, b| {
        b.is_self
            .cmp(&a.is_self)
            .then(b.same_location.cmp(&a.same_location))
            .then_with(|| a.driver_name.to_lowercase().cmp(&b.driver_name.to_lowercase()))
    });
}

pub fn available_drivers(state: &AppState, caller: &Caller) -> DriverList {
    let mut drivers: Vec<AvailableDriver> = state.store.read(|t| {
        t.users()
            .filter(|u| u.is_active && u.roles.contains(&UserRole::AppTripDriver))
            .map(|u| {
                let is_self = u.id == caller.id;
                let same_location = u.base_location_id == caller.base_location_id;
                let location = t.user_location_name(&u.id);
                let driver_name = if is_self {
                    format!("[SELF] {}", u.person_name)
                } else if !same_location && !location.is_empty() {
                    format!("{} ({location})", u.person_name)
                } else {
                    u.person_name.clone()
                };
                AvailableDriver {
                    user_id: u.id.clone(),
                    driver_name,
                    vehicle_number: u.vehicle_nbr.clone(),
                    base_location_name: location,
                    same_location,
                    is_self,
                }
            })
            .collect()
    });
    rank_drivers(&mut drivers);

    DriverList {
        success: true,
        message: format!("Found {} available drivers", drivers.len()),
        drivers,
    }
}

/// Latest position of a STARTED trip's driver since shortly before the start.
fn driver_position(state: &AppState, trip: &Trip) -> Option<DriverLocation> {
    let started_at = trip.started_at.filter(|_| trip.status == TripStatus::Started)?;
    state
        .store
        .latest_heartbeat(&trip.driven_by, Some(started_at - Duration::minutes(1)))
        .map(|hb| DriverLocation {
            location: hb.location,
            received_at: hb.received_at,
        })
}

fn summarize(state: &AppState, t: &Tables, trip: &Trip) -> TripSummary {
    let docs: Vec<&Document> = t.documents_of_trip(trip.id).collect();

    let direct: Vec<&&Document> = docs.iter().filter(|d| d.lot.is_none()).collect();
    let total_direct = direct.len();
    let pending_direct = direct
        .iter()
        .filter(|d| !matches!(d.status, DocStatus::Delivered | DocStatus::Undelivered))
        .count();
    let pending_lots = docs
        .iter()
        .filter(|d| d.trip_id == Some(trip.id))
        .filter_map(|d| d.lot.as_deref())
        .collect::<BTreeSet<_>>()
        .len();

    let delivery_count_status_msg = if total_direct == 0 {
        "No Direct Deliveries".to_string()
    } else if trip.status == TripStatus::Scheduled {
        format!("Direct Deliveries: {total_direct}")
    } else if pending_direct == 0 {
        "No Pending Deliveries".to_string()
    } else {
        format!("Deliveries: {pending_direct} pending out of {total_direct}")
    };
    let drop_off_count_status_msg = if pending_lots == 0 {
        "No Lots To Be Dropped Off".to_string()
    } else {
        format!("Lots To Be Dropped Off: {pending_lots}")
    };

    let name = |id: &str| t.user(id).map(|u| u.person_name.clone()).unwrap_or_default();
    TripSummary {
        trip_id: trip.id,
        created_by: name(&trip.created_by),
        created_by_id: trip.created_by.clone(),
        driver_name: name(&trip.driven_by),
        driver_id: trip.driven_by.clone(),
        driver_phone_number: t
            .user(&trip.driven_by)
            .map(|u| u.mobile.clone())
            .unwrap_or_default(),
        vehicle_number: trip.vehicle_nbr.clone(),
        status: trip.status,
        route: trip.route.clone(),
        created_at: trip.created_at,
        started_at: trip.started_at,
        last_updated_at: trip.last_updated_at,
        creator_location: t.user_location_name(&trip.created_by),
        driver_location: t.user_location_name(&trip.driven_by),
        driver_last_known_location: driver_position(state, trip),
        pending_direct_deliveries: pending_direct,
        total_direct_deliveries: total_direct,
        delivery_count_status_msg,
        pending_lot_drop_offs: pending_lots,
        drop_off_count_status_msg,
    }
}

fn run_sheet_doc(t: &Tables, doc: &Document) -> RunSheetDoc {
    let customer = t.customer(&doc.customer_id);
    RunSheetDoc {
        id: doc.id.clone(),
        status: doc.status,
        last_scanned_by: doc.last_scanned_by.clone(),
        origin_warehouse: doc.origin_warehouse.clone(),
        trip_id: doc.trip_id.or(doc.last_trip_id),
        doc_date: doc.doc_date,
        doc_amount: doc.doc_amount,
        route: doc.route.clone(),
        lot: doc.lot.clone(),
        comment: doc.comment.clone(),
        customer_id: doc.customer_id.clone(),
        transit_hub: doc.transit_hub,
        customer_firm_name: customer.map(|c| c.firm_name.clone()).unwrap_or_default(),
        customer_address: customer.and_then(|c| c.address.clone()).unwrap_or_default(),
        customer_city: customer.and_then(|c| c.city.clone()).unwrap_or_default(),
        customer_pincode: customer.and_then(|c| c.pincode.clone()).unwrap_or_default(),
        customer_phone: customer.and_then(|c| c.phone.clone()).unwrap_or_default(),
        customer_location: customer.and_then(|c| c.geo),
    }
}

/// Groups run-sheet documents by lot, lots alphabetically and direct
/// deliveries last. Members are ordered by distance from `driver` when known.
fn group_by_lot(docs: Vec<RunSheetDoc>, driver: Option<GeoPoint>) -> Vec<DocGroup> {
    let mut lots: BTreeMap<String, Vec<RunSheetDoc>> = BTreeMap::new();
    for doc in docs {
        let heading = doc
            .lot
            .clone()
            .unwrap_or_else(|| DIRECT_DELIVERIES_HEADING.to_string());
        lots.entry(heading).or_default().push(doc);
    }

    let mut groups: Vec<DocGroup> = lots
        .into_iter()
        .map(|(heading, mut docs)| {
            let direct = heading == DIRECT_DELIVERIES_HEADING;
            if let Some(origin) = driver {
                sort_by_distance(&mut docs, &origin, |d| d.customer_location);
            }
            let drop_off_completed = !direct
                && docs.iter().all(|d| {
                    matches!(
                        d.status,
                        DocStatus::AtTransitHub | DocStatus::Delivered | DocStatus::Undelivered
                    )
                });
            DocGroup {
                heading,
                droppable: !direct,
                drop_off_completed,
                show_drop_off_button: !direct && !drop_off_completed,
                expand_by_default: direct,
                docs,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        match (a.heading == DIRECT_DELIVERIES_HEADING, b.heading == DIRECT_DELIVERIES_HEADING) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => a.heading.cmp(&b.heading),
        }
    });
    groups
}

pub fn trip_details(state: &AppState, trip_id: i64) -> Result<TripDetails, AppError> {
    let (trip, summary, docs) = state.store.read(|t| {
        let trip = load_trip(t, trip_id)?;
        let summary = summarize(state, t, &trip);
        let mut docs: Vec<&Document> = t.documents_of_trip(trip_id).collect();
        docs.sort_by(|a, b| a.lot.cmp(&b.lot).then_with(|| a.id.cmp(&b.id)));
        let docs = docs.into_iter().map(|d| run_sheet_doc(t, d)).collect::<Vec<_>>();
        Ok::<_, AppError>((trip, summary, docs))
    })?;

    let driver = state
        .store
        .latest_heartbeat(&trip.driven_by, Some(Utc::now() - Duration::hours(1)))
        .map(|hb| hb.location);

    Ok(TripDetails {
        summary,
        doc_groups: group_by_lot(docs, driver),
    })
}

fn trip_list(state: &AppState, trips: Vec<Trip>, empty: &str, found: &str) -> TripList {
    let summaries: Vec<TripSummary> = state
        .store
        .read(|t| trips.iter().map(|trip| summarize(state, t, trip)).collect());
    let message = if summaries.is_empty() {
        empty.to_string()
    } else {
        format!("Found {} {found}.", summaries.len())
    };
    TripList {
        success: true,
        message,
        total_trips: summaries.len(),
        trips: summaries,
    }
}

fn newest_first(a: &DateTime<Utc>, b: &DateTime<Utc>) -> Ordering {
    b.cmp(a)
}

/// SCHEDULED and STARTED trips driven by the caller, started ones first.
pub fn my_trips(state: &AppState, caller: &Caller) -> TripList {
    let mut trips: Vec<Trip> = state.store.read(|t| {
        t.trips()
            .filter(|trip| {
                trip.driven_by == caller.id
                    && matches!(trip.status, TripStatus::Scheduled | TripStatus::Started)
            })
            .cloned()
            .collect()
    });
    trips.sort_by(|a, b| {
        (b.status == TripStatus::Started)
            .cmp(&(a.status == TripStatus::Started))
            .then_with(|| newest_first(&a.created_at, &b.created_at))
    });
    trip_list(state, trips, "No trips found for you.", "trip(s) for you")
}

/// SCHEDULED trips created by users of the caller's base location.
pub fn scheduled_trips_for_location(state: &AppState, caller: &Caller) -> TripList {
    let mut trips: Vec<Trip> = state.store.read(|t| {
        t.trips()
            .filter(|trip| {
                trip.status == TripStatus::Scheduled
                    && t.user(&trip.created_by)
                        .is_some_and(|u| u.base_location_id == caller.base_location_id)
            })
            .cloned()
            .collect()
    });
    trips.sort_by(|a, b| newest_first(&a.created_at, &b.created_at));
    trip_list(
        state,
        trips,
        "No trips have been scheduled from your location.",
        "scheduled trip(s) from your location",
    )
}

/// Hours an ENDED trip stays on the all-trips board.
pub const ENDED_TRIP_VISIBLE_HOURS: i64 = 48;

/// Open trips of every location plus those ended recently, last touched first.
pub fn all_trips(state: &AppState) -> TripList {
    let ended_cutoff = Utc::now() - Duration::hours(ENDED_TRIP_VISIBLE_HOURS);
    let mut trips: Vec<Trip> = state.store.read(|t| {
        t.trips()
            .filter(|trip| match trip.status {
                TripStatus::Scheduled | TripStatus::Started => true,
                TripStatus::Ended => trip.last_updated_at >= ended_cutoff,
                TripStatus::Cancelled => false,
            })
            .cloned()
            .collect()
    });
    trips.sort_by(|a, b| newest_first(&a.last_updated_at, &b.last_updated_at));
    trip_list(
        state,
        trips,
        "No trips found.",
        "trip(s) (scheduled, started, or ended within last 48 hours)",
    )
}

/// SCHEDULED trips of every location, newest first.
pub fn all_scheduled_trips(state: &AppState) -> TripList {
    let mut trips: Vec<Trip> = state.store.read(|t| {
        t.trips()
            .filter(|trip| trip.status == TripStatus::Scheduled)
            .cloned()
            .collect()
    });
    trips.sort_by(|a, b| newest_first(&a.created_at, &b.created_at));
    trip_list(state, trips, "No trips have been scheduled.", "scheduled trip(s)")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn driver(name: &str, is_self: bool, same_location: bool) -> AvailableDriver {
        AvailableDriver {
            user_id: name.to_string(),
            driver_name: name.to_string(),
            vehicle_number: None,
            base_location_name: String::new(),
            same_location,
            is_self,
        }
    }

    #[test]
    fn ranks_self_then_location_then_name() {
        let mut drivers = vec![
            driver("zed (Thrissur)", false, false),
            driver("maya", false, true),
            driver("[SELF] omar", true, true),
            driver("anil (Thrissur)", false, false),
            driver("bina", false, true),
        ];
        rank_drivers(&mut drivers);

        let names: Vec<&str> = drivers.iter().map(|d| d.driver_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["[SELF] omar", "bina", "maya", "anil (Thrissur)", "zed (Thrissur)"]
        );
    }

    fn sheet_doc(
        id: &str,
        lot: Option<&str>,
        status: DocStatus,
        at: Option<GeoPoint>,
    ) -> RunSheetDoc {
        RunSheetDoc {
            id: id.to_string(),
            status,
            last_scanned_by: "U1".to_string(),
            origin_warehouse: None,
            trip_id: Some(1),
            doc_date: Utc::now(),
            doc_amount: Decimal::ZERO,
            route: "R1".to_string(),
            lot: lot.map(str::to_string),
            comment: None,
            customer_id: format!("C-{id}"),
            transit_hub: None,
            customer_firm_name: String::new(),
            customer_address: String::new(),
            customer_city: String::new(),
            customer_pincode: String::new(),
            customer_phone: String::new(),
            customer_location: at,
        }
    }

    #[test]
    fn direct_deliveries_group_sorts_last() {
        let docs = vec![
            sheet_doc("D1", None, DocStatus::OnTrip, None),
            sheet_doc("D2", Some("ZETA"), DocStatus::AtTransitHub, None),
            sheet_doc("D3", Some("ALPHA"), DocStatus::OnTrip, None),
            sheet_doc("D4", Some("ZETA"), DocStatus::Delivered, None),
        ];
        let groups = group_by_lot(docs, None);

        let headings: Vec<&str> = groups.iter().map(|g| g.heading.as_str()).collect();
        assert_eq!(headings, vec!["ALPHA", "ZETA", DIRECT_DELIVERIES_HEADING]);

        assert!(groups[0].show_drop_off_button);
        assert!(groups[1].drop_off_completed);
        assert!(!groups[1].show_drop_off_button);
        assert!(!groups[2].droppable);
        assert!(groups[2].expand_by_default);
        assert!(!groups[2].drop_off_completed);
    }

    #[test]
    fn members_follow_driver_distance() {
        let driver = GeoPoint { lat: 10.0, lng: 76.0 };
        let docs = vec![
            sheet_doc("FAR", None, DocStatus::OnTrip, Some(GeoPoint { lat: 10.5, lng: 76.0 })),
            sheet_doc("NOWHERE", None, DocStatus::OnTrip, None),
            sheet_doc("NEAR", None, DocStatus::OnTrip, Some(GeoPoint { lat: 10.1, lng: 76.0 })),
        ];

        let groups = group_by_lot(docs.clone(), Some(driver));
        let ids: Vec<&str> = groups[0].docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["NEAR", "FAR", "NOWHERE"]);

        let unsorted = group_by_lot(docs, None);
        let ids: Vec<&str> = unsorted[0].docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["FAR", "NOWHERE", "NEAR"]);
    }
}
