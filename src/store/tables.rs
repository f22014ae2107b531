use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::StoreError;
use crate::models::customer::{Customer, CustomerDetails};
use crate::models::document::{Document, Signature};
use crate::models::location::GeoPoint;
use crate::models::trip::{Trip, TripStatus};
use crate::models::user::{AppUser, BaseLocation};

/// Row data for a trip whose id the store assigns.
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub created_by: String,
    pub driven_by: String,
    pub vehicle_nbr: String,
    pub route: String,
    pub created_at: DateTime<Utc>,
}

/// The relational tables. Writers go through the checked helpers so keys,
/// references and the document/trip attachment rule hold after every call.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    documents: BTreeMap<String, Document>,
    customers: BTreeMap<String, Customer>,
    trips: BTreeMap<i64, Trip>,
    signatures: BTreeMap<String, Signature>,
    users: BTreeMap<String, AppUser>,
    base_locations: BTreeMap<String, BaseLocation>,
    settings: BTreeMap<String, String>,
    last_trip_id: i64,
}

impl Tables {
    // ---- documents ----

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn documents_on_trip(&self, trip_id: i64) -> impl Iterator<Item = &Document> {
        self.documents
            .values()
            .filter(move |d| d.trip_id == Some(trip_id))
    }

    /// Documents a trip carries or carried: attached, dropped at a hub, or
    /// delivered and failed on it. Re-queued documents are no longer included.
    pub fn documents_of_trip(&self, trip_id: i64) -> impl Iterator<Item = &Document> {
        self.documents
            .values()
            .filter(move |d| d.last_trip_id == Some(trip_id))
    }

    pub fn insert_document(&mut self, doc: Document) -> Result<(), StoreError> {
        if self.documents.contains_key(&doc.id) {
            return Err(StoreError::DuplicateKey {
                table: "doc",
                key: doc.id,
            });
        }
        self.check_document(&doc)?;
        self.documents.insert(doc.id.clone(), doc);
        Ok(())
    }

    /// Applies `f` to a document and re-validates the row afterwards.
    pub fn update_document(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Document),
    ) -> Result<(), StoreError> {
        let mut doc = self
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::MissingRow {
                table: "doc",
                key: id.to_string(),
            })?;
        f(&mut doc);
        if doc.id != id {
            return Err(StoreError::Constraint {
                table: "doc",
                key: id.to_string(),
                reason: "primary key cannot change".to_string(),
            });
        }
        self.check_document(&doc)?;
        self.documents.insert(doc.id.clone(), doc);
        Ok(())
    }

    /// Deletes a document together with its signature.
    pub fn delete_document(&mut self, id: &str) -> Option<Document> {
        self.signatures.remove(id);
        self.documents.remove(id)
    }

    fn check_document(&self, doc: &Document) -> Result<(), StoreError> {
        if !self.customers.contains_key(&doc.customer_id) {
            return Err(StoreError::ForeignKey {
                table: "doc",
                referenced: "customer",
                key: doc.customer_id.clone(),
            });
        }
        if !self.users.contains_key(&doc.last_scanned_by) {
            return Err(StoreError::ForeignKey {
                table: "doc",
                referenced: "app_user",
                key: doc.last_scanned_by.clone(),
            });
        }
        for trip_id in [doc.trip_id, doc.last_trip_id].into_iter().flatten() {
            if !self.trips.contains_key(&trip_id) {
                return Err(StoreError::ForeignKey {
                    table: "doc",
                    referenced: "trip",
                    key: trip_id.to_string(),
                });
            }
        }
        if doc.trip_id.is_some() != doc.status.is_trip_bound() {
            return Err(StoreError::Constraint {
                table: "doc",
                key: doc.id.clone(),
                reason: format!(
                    "status {} with trip {:?}",
                    doc.status, doc.trip_id
                ),
            });
        }
        Ok(())
    }

    // ---- customers ----

    pub fn customers(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values()
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.get(id)
    }

    /// Inserts or refreshes customer master data. A stored geo point is kept.
    pub fn upsert_customer(&mut self, details: CustomerDetails, at: DateTime<Utc>) {
        match self.customers.get_mut(&details.id) {
            Some(existing) => existing.apply_details(details, at),
            None => {
                let customer = Customer::from_details(details, at);
                self.customers.insert(customer.id.clone(), customer);
            }
        }
    }

    pub fn set_customer_geo(
        &mut self,
        id: &str,
        geo: GeoPoint,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let customer = self
            .customers
            .get_mut(id)
            .ok_or_else(|| StoreError::MissingRow {
                table: "customer",
                key: id.to_string(),
            })?;
        customer.geo = Some(geo);
        customer.last_updated_at = at;
        Ok(())
    }

    /// Deletes a customer no document refers to.
    pub fn delete_customer(&mut self, id: &str) -> Result<Option<Customer>, StoreError> {
        if self.documents.values().any(|d| d.customer_id == id) {
            return Err(StoreError::Constraint {
                table: "customer",
                key: id.to_string(),
                reason: "still referenced by documents".to_string(),
            });
        }
        Ok(self.customers.remove(id))
    }

    // ---- trips ----

    pub fn trips(&self) -> impl Iterator<Item = &Trip> {
        self.trips.values()
    }

    pub fn trip(&self, id: i64) -> Option<&Trip> {
        self.trips.get(&id)
    }

    /// Inserts a SCHEDULED trip and returns its generated id.
    pub fn insert_trip(&mut self, new: NewTrip) -> Result<i64, StoreError> {
        for user in [&new.created_by, &new.driven_by] {
            if !self.users.contains_key(user) {
                return Err(StoreError::ForeignKey {
                    table: "trip",
                    referenced: "app_user",
                    key: user.clone(),
                });
            }
        }
        self.last_trip_id += 1;
        let id = self.last_trip_id;
        self.trips.insert(
            id,
            Trip {
                id,
                created_by: new.created_by,
                driven_by: new.driven_by,
                vehicle_nbr: new.vehicle_nbr,
                route: new.route,
                status: TripStatus::Scheduled,
                created_at: new.created_at,
                started_at: None,
                last_updated_at: new.created_at,
            },
        );
        Ok(id)
    }

    pub fn update_trip(&mut self, id: i64, f: impl FnOnce(&mut Trip)) -> Result<(), StoreError> {
        let trip = self
            .trips
            .get_mut(&id)
            .ok_or_else(|| StoreError::MissingRow {
                table: "trip",
                key: id.to_string(),
            })?;
        f(trip);
        trip.id = id;
        Ok(())
    }

    // ---- signatures ----

    pub fn signature(&self, doc_id: &str) -> Option<&Signature> {
        self.signatures.get(doc_id)
    }

    pub fn upsert_signature(
        &mut self,
        doc_id: &str,
        signature: Vec<u8>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if !self.documents.contains_key(doc_id) {
            return Err(StoreError::ForeignKey {
                table: "doc_signature",
                referenced: "doc",
                key: doc_id.to_string(),
            });
        }
        self.signatures.insert(
            doc_id.to_string(),
            Signature {
                doc_id: doc_id.to_string(),
                signature: signature.into(),
                last_updated_at: at,
            },
        );
        Ok(())
    }

    // ---- directory ----

    pub fn users(&self) -> impl Iterator<Item = &AppUser> {
        self.users.values()
    }

    pub fn user(&self, id: &str) -> Option<&AppUser> {
        self.users.get(id)
    }

    pub fn upsert_user(&mut self, user: AppUser) -> Result<(), StoreError> {
        if !self.base_locations.contains_key(&user.base_location_id) {
            return Err(StoreError::ForeignKey {
                table: "app_user",
                referenced: "base_location",
                key: user.base_location_id,
            });
        }
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    pub fn base_location(&self, id: &str) -> Option<&BaseLocation> {
        self.base_locations.get(id)
    }

    pub fn upsert_base_location(&mut self, location: BaseLocation) {
        self.base_locations.insert(location.id.clone(), location);
    }

    /// Name of the base location a user belongs to, empty when unknown.
    pub fn user_location_name(&self, user_id: &str) -> String {
        self.users
            .get(user_id)
            .and_then(|u| self.base_locations.get(&u.base_location_id))
            .map(|l| l.name.clone())
            .unwrap_or_default()
    }

    // ---- settings ----

    pub fn settings(&self) -> impl Iterator<Item = (&String, &String)> {
        self.settings.iter()
    }

    pub fn setting(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(String::as_str)
    }

    pub fn put_setting(&mut self, name: &str, value: &str) {
        self.settings.insert(name.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::document::DocStatus;

    fn seeded() -> Tables {
        let mut t = Tables::default();
        t.upsert_base_location(BaseLocation {
            id: "BL1".to_string(),
            name: "Kochi".to_string(),
        });
        t.upsert_user(AppUser {
            id: "U1".to_string(),
            person_name: "Asha".to_string(),
            mobile: "9000000001".to_string(),
            base_location_id: "BL1".to_string(),
            vehicle_nbr: None,
            roles: vec![],
            is_active: true,
        })
        .unwrap();
        t.upsert_customer(
            CustomerDetails {
                id: "C1".to_string(),
                firm_name: "Care Pharma".to_string(),
                address: None,
                city: None,
                pincode: None,
                phone: None,
            },
            Utc::now(),
        );
        t
    }

    fn doc(id: &str) -> Document {
        let now = Utc::now();
        Document {
            id: id.to_string(),
            status: DocStatus::ReadyForDispatch,
            last_scanned_by: "U1".to_string(),
            origin_warehouse: None,
            trip_id: None,
            last_trip_id: None,
            doc_date: now,
            doc_amount: Decimal::ZERO,
            route: "R1".to_string(),
            lot: None,
            comment: None,
            customer_id: "C1".to_string(),
            transit_hub: None,
            created_at: now,
            last_updated_at: now,
        }
    }

    #[test]
    fn rejects_duplicate_document() {
        let mut t = seeded();
        t.insert_document(doc("D1")).unwrap();
        let err = t.insert_document(doc("D1")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[test]
    fn rejects_document_for_unknown_customer() {
        let mut t = seeded();
        let mut d = doc("D1");
        d.customer_id = "nope".to_string();
        let err = t.insert_document(d).unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey { referenced: "customer", .. }));
    }

    #[test]
    fn trip_bound_status_requires_trip() {
        let mut t = seeded();
        t.insert_document(doc("D1")).unwrap();
        let err = t
            .update_document("D1", |d| d.status = DocStatus::OnTrip)
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
        assert_eq!(t.document("D1").unwrap().status, DocStatus::ReadyForDispatch);
    }

    #[test]
    fn trip_ids_are_sequential() {
        let mut t = seeded();
        let new = NewTrip {
            created_by: "U1".to_string(),
            driven_by: "U1".to_string(),
            vehicle_nbr: "KL-07".to_string(),
            route: "R1".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(t.insert_trip(new.clone()).unwrap(), 1);
        assert_eq!(t.insert_trip(new).unwrap(), 2);
    }

    #[test]
    fn upsert_customer_keeps_geo() {
        let mut t = seeded();
        let at = Utc::now();
        t.set_customer_geo("C1", GeoPoint { lat: 9.9, lng: 76.2 }, at)
            .unwrap();
        t.upsert_customer(
            CustomerDetails {
                id: "C1".to_string(),
                firm_name: "Care Pharma Ltd".to_string(),
                address: None,
                city: None,
                pincode: None,
                phone: None,
            },
            at,
        );
        let c = t.customer("C1").unwrap();
        assert_eq!(c.firm_name, "Care Pharma Ltd");
        assert!(c.geo.is_some());
    }

    #[test]
    fn customer_with_documents_cannot_be_deleted() {
        let mut t = seeded();
        t.insert_document(doc("D1")).unwrap();
        assert!(t.delete_customer("C1").is_err());
        t.delete_document("D1");
        assert!(t.delete_customer("C1").unwrap().is_some());
    }
}
