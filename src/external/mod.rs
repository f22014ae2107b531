//! Outbound collaborators: the ERP document source and status hook, the SMS
//! gateway and the ETA provider. Each has an HTTP client and an unconfigured
//! stand-in so the service runs without any of them.

pub mod erp;
pub mod eta;
pub mod mock_source;
pub mod notify;
pub mod sms;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::models::customer::CustomerDetails;
use crate::models::document::DocStatus;
use crate::models::location::GeoPoint;

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("{target} is not configured: {reason}")]
    NotConfigured { target: &'static str, reason: String },

    #[error("{target} request failed: {reason}")]
    Transport { target: &'static str, reason: String },

    #[error("{target} returned HTTP {status}")]
    Status { target: &'static str, status: u16 },

    #[error("{target} response could not be decoded: {reason}")]
    Decode { target: &'static str, reason: String },

    #[error("{target} timed out after {secs}s")]
    Timeout { target: &'static str, secs: u64 },
}

/// A document as the ERP describes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub doc_id: String,
    #[serde(default)]
    pub status: Option<String>,
    pub route_id: String,
    #[serde(default)]
    pub lot_nbr: Option<String>,
    #[serde(default)]
    pub whse_location_name: Option<String>,
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub customer_city: Option<String>,
    #[serde(default)]
    pub customer_pin_code: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub doc_date: DateTime<Utc>,
    pub doc_amount: Decimal,
}

impl SourceDocument {
    /// The lot number, treating a blank value as no lot.
    pub fn lot(&self) -> Option<String> {
        self.lot_nbr
            .as_deref()
            .map(str::trim)
            .filter(|lot| !lot.is_empty())
            .map(str::to_string)
    }

    pub fn customer_details(&self) -> CustomerDetails {
        CustomerDetails {
            id: self.customer_id.clone(),
            firm_name: self.customer_name.clone(),
            address: self.customer_address.clone(),
            city: self.customer_city.clone(),
            pincode: self.customer_pin_code.clone(),
            phone: self.customer_phone.clone(),
        }
    }
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Looks a document up; `Ok(None)` when the source does not know it.
    async fn resolve(
        &self,
        doc_id: &str,
        requested_by: &str,
    ) -> Result<Option<SourceDocument>, ExternalError>;
}

#[async_trait]
pub trait StatusSync: Send + Sync {
    async fn notify(
        &self,
        doc_id: &str,
        status: DocStatus,
        acting_user_id: &str,
    ) -> Result<(), ExternalError>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_tracking_link(
        &self,
        phone: &str,
        doc_id: &str,
        token: &str,
    ) -> Result<(), ExternalError>;
}

#[async_trait]
pub trait EtaProvider: Send + Sync {
    /// Driving time in minutes, `None` when no route is known.
    async fn estimate(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Option<i64>, ExternalError>;
}

/// Stand-in for a collaborator that has no configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl DocumentSource for Unconfigured {
    async fn resolve(&self, _: &str, _: &str) -> Result<Option<SourceDocument>, ExternalError> {
        Ok(None)
    }
}

#[async_trait]
impl StatusSync for Unconfigured {
    async fn notify(&self, doc_id: &str, status: DocStatus, _: &str) -> Result<(), ExternalError> {
        tracing::debug!(doc_id, %status, "status sync not configured; skipping");
        Ok(())
    }
}

#[async_trait]
impl SmsSender for Unconfigured {
    async fn send_tracking_link(
        &self,
        _: &str,
        doc_id: &str,
        _: &str,
    ) -> Result<(), ExternalError> {
        tracing::debug!(doc_id, "sms gateway not configured; skipping");
        Ok(())
    }
}

#[async_trait]
impl EtaProvider for Unconfigured {
    async fn estimate(&self, _: GeoPoint, _: GeoPoint) -> Result<Option<i64>, ExternalError> {
        Err(ExternalError::NotConfigured {
            target: "eta",
            reason: "ETA_API_URL is not set".to_string(),
        })
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub documents: Arc<dyn DocumentSource>,
    pub status_sync: Arc<dyn StatusSync>,
    pub sms: Arc<dyn SmsSender>,
    pub eta: Arc<dyn EtaProvider>,
}

impl Collaborators {
    /// No outbound calls at all.
    pub fn offline() -> Self {
        Self {
            documents: Arc::new(Unconfigured),
            status_sync: Arc::new(Unconfigured),
            sms: Arc::new(Unconfigured),
            eta: Arc::new(Unconfigured),
        }
    }

    /// HTTP clients for every collaborator with configuration present.
    pub fn from_config(config: &Config) -> Result<Self, ExternalError> {
        let timeout = Duration::from_secs(config.outbound_timeout_secs);
        let mut collaborators = Self::offline();

        if let Some(base_url) = &config.erp_api_base_url {
            let client = Arc::new(erp::ErpClient::new(erp::ErpConfig {
                base_url: base_url.clone(),
                prod_code: config.erp_api_prod_code.clone().unwrap_or_default(),
                token: config.erp_api_token.clone().unwrap_or_default(),
                timeout,
            })?);
            collaborators.documents = client.clone();
            collaborators.status_sync = client;
            tracing::info!(base_url = %base_url, "erp client configured");
        }

        if let Some(template) = &config.sms_url_template {
            collaborators.sms = Arc::new(sms::HttpSmsSender::new(sms::SmsConfig {
                url_template: template.clone(),
                api_key: config.sms_api_key.clone().unwrap_or_default(),
                template_name: config.track_sms_template.clone().unwrap_or_default(),
                timeout,
            })?);
            tracing::info!("sms gateway configured");
        }

        if let Some(url) = &config.eta_api_url {
            collaborators.eta = Arc::new(eta::HttpEtaProvider::new(url, timeout)?);
            tracing::info!(url = %url, "eta provider configured");
        }

        Ok(collaborators)
    }
}

pub(crate) fn http_client(
    target: &'static str,
    timeout: Duration,
    headers: reqwest::header::HeaderMap,
) -> Result<reqwest::Client, ExternalError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|err| ExternalError::NotConfigured {
            target,
            reason: format!("failed to build HTTP client: {err}"),
        })
}

pub(crate) fn transport_error(
    target: &'static str,
    timeout: Duration,
    err: reqwest::Error,
) -> ExternalError {
    if err.is_timeout() {
        ExternalError::Timeout {
            target,
            secs: timeout.as_secs(),
        }
    } else {
        ExternalError::Transport {
            target,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_payload() {
        let doc: SourceDocument = serde_json::from_value(serde_json::json!({
            "docId": "INV-1",
            "routeId": "R7",
            "lotNbr": "  ",
            "customerId": "C9",
            "customerName": "Lakeside Medicals",
            "customerPinCode": "682001",
            "docDate": "2024-05-01T10:00:00Z",
            "docAmount": 1520.5
        }))
        .unwrap();

        assert_eq!(doc.doc_id, "INV-1");
        assert_eq!(doc.lot(), None);
        assert_eq!(doc.customer_details().pincode.as_deref(), Some("682001"));
    }

    #[tokio::test]
    async fn unconfigured_eta_is_an_error() {
        let eta = Unconfigured;
        let origin = GeoPoint { lat: 0.0, lng: 0.0 };
        assert!(eta.estimate(origin, origin).await.is_err());
    }
}
