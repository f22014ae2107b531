use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::AppError;
use crate::models::document::{DocStatus, Document};
use crate::models::report::{DeliveryReport, DeliveryReportQuery, DeliveryReportRow};
use crate::state::AppState;
use crate::store::Tables;

/// Longest range, in days, a delivery report may cover.
pub const MAX_REPORT_DAYS: i64 = 30;

/// Half-open `[start, end)` window covering whole days.
fn report_window(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => {
            if to < from {
                return Err(AppError::BadRequest(
                    "to_date must not be before from_date.".to_string(),
                ));
            }
            if (to - from).num_days() + 1 > MAX_REPORT_DAYS {
                return Err(AppError::BadRequest(
                    "Date range cannot exceed 1 month.".to_string(),
                ));
            }
            (from, to)
        }
        (None, None) => (today - Duration::days(MAX_REPORT_DAYS), today),
        _ => {
            return Err(AppError::BadRequest(
                "from_date and to_date must be given together.".to_string(),
            ));
        }
    };

    let start = from.and_time(NaiveTime::MIN).and_utc();
    let end = (to + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
    Ok((start, end))
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn matches_filters(t: &Tables, doc: &Document, trip_id: i64, query: &DeliveryReportQuery) -> bool {
    let trip = t.trip(trip_id);
    let customer = t.customer(&doc.customer_id);

    given(&query.customer_id).is_none_or(|id| doc.customer_id == id)
        && given(&query.doc_id).is_none_or(|part| doc.id.contains(part))
        && given(&query.route).is_none_or(|route| doc.route == route)
        && query.trip_id.is_none_or(|id| id == trip_id)
        && given(&query.origin_warehouse)
            .is_none_or(|whse| doc.origin_warehouse.as_deref() == Some(whse))
        && given(&query.customer_city).is_none_or(|cities| {
            let city = customer.and_then(|c| c.city.as_deref());
            cities.split(',').map(str::trim).any(|c| !c.is_empty() && Some(c) == city)
        })
        && given(&query.driver_user_id)
            .is_none_or(|driver| trip.is_some_and(|trip| trip.driven_by == driver))
        && given(&query.trip_start_location).is_none_or(|location| {
            trip.and_then(|trip| t.user(&trip.created_by))
                .is_some_and(|creator| creator.base_location_id == location)
        })
}

fn report_row(t: &Tables, doc: &Document, trip_id: i64) -> Option<DeliveryReportRow> {
    let trip = t.trip(trip_id)?;
    let customer = t.customer(&doc.customer_id);
    let name = |id: &str| t.user(id).map(|u| u.person_name.clone()).unwrap_or_default();

    Some(DeliveryReportRow {
        doc_id: doc.id.clone(),
        status: doc.status,
        origin_warehouse: doc.origin_warehouse.clone().unwrap_or_default(),
        doc_date: doc.doc_date,
        trip_id,
        comment: doc.comment.clone().unwrap_or_default(),
        customer_id: doc.customer_id.clone(),
        last_updated_at: doc.last_updated_at,
        firm_name: customer.map(|c| c.firm_name.clone()).unwrap_or_default(),
        address: customer.and_then(|c| c.address.clone()).unwrap_or_default(),
        city: customer.and_then(|c| c.city.clone()).unwrap_or_default(),
        pincode: customer.and_then(|c| c.pincode.clone()).unwrap_or_default(),
        created_by: trip.created_by.clone(),
        created_by_person_name: name(&trip.created_by),
        created_by_location: t.user_location_name(&trip.created_by),
        driven_by: trip.driven_by.clone(),
        driver_name: name(&trip.driven_by),
        vehicle_nbr: trip.vehicle_nbr.clone(),
        route: trip.route.clone(),
        trip_status: trip.status,
    })
}

/// Delivered and undelivered documents of trips, by document date. Newest
/// trips come first, then customers in ascending order.
pub fn delivery_report(
    state: &AppState,
    query: &DeliveryReportQuery,
) -> Result<DeliveryReport, AppError> {
    let (start, end) = report_window(query.from_date, query.to_date, Utc::now().date_naive())?;

    let mut data: Vec<DeliveryReportRow> = state.store.read(|t| {
        t.documents()
            .filter(|d| matches!(d.status, DocStatus::Delivered | DocStatus::Undelivered))
            .filter(|d| d.doc_date >= start && d.doc_date < end)
            .filter_map(|d| d.last_trip_id.map(|trip_id| (d, trip_id)))
            .filter(|(d, trip_id)| matches_filters(t, d, *trip_id, query))
            .filter_map(|(d, trip_id)| report_row(t, d, trip_id))
            .collect()
    });
    data.sort_by(|a, b| {
        b.trip_id
            .cmp(&a.trip_id)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });

    Ok(DeliveryReport {
        success: true,
        message: format!("Retrieved {} delivery report records", data.len()),
        total_records: data.len(),
        data,
    })
}
