use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub firm_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub phone: Option<String>,
    /// Only written by a delivery with coordinates, never by scans.
    pub geo: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

/// Master data carried by a scan.
#[derive(Debug, Clone)]
pub struct CustomerDetails {
    pub id: String,
    pub firm_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub phone: Option<String>,
}

impl Customer {
    pub fn from_details(details: CustomerDetails, at: DateTime<Utc>) -> Self {
        Self {
            id: details.id,
            firm_name: details.firm_name,
            address: details.address,
            city: details.city,
            pincode: details.pincode,
            phone: details.phone,
            geo: None,
            created_at: at,
            last_updated_at: at,
        }
    }

    pub fn apply_details(&mut self, details: CustomerDetails, at: DateTime<Utc>) {
        self.firm_name = details.firm_name;
        self.address = details.address;
        self.city = details.city;
        self.pincode = details.pincode;
        self.phone = details.phone;
        self.last_updated_at = at;
    }
}
