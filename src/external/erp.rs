use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::Serialize;

use super::{
    http_client, transport_error, DocumentSource, ExternalError, SourceDocument, StatusSync,
};
use crate::models::document::DocStatus;

const TARGET: &str = "erp";

#[derive(Debug, Clone)]
pub struct ErpConfig {
    pub base_url: String,
    pub prod_code: String,
    pub token: String,
    pub timeout: Duration,
}

/// HTTP client for the ERP document lookup and status hook.
#[derive(Debug)]
pub struct ErpClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdate<'a> {
    doc_id: &'a str,
    status: DocStatus,
    user_id: &'a str,
}

impl ErpClient {
    pub fn new(config: ErpConfig) -> Result<Self, ExternalError> {
        let mut headers = HeaderMap::new();
        let credentials = [
            ("x-api-prod-code", &config.prod_code),
            ("x-api-token", &config.token),
        ];
        for (name, value) in credentials {
            let value = HeaderValue::from_str(value).map_err(|_| ExternalError::NotConfigured {
                target: TARGET,
                reason: format!("invalid characters in {name}"),
            })?;
            headers.insert(name, value);
        }

        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|err| {
            ExternalError::NotConfigured {
                target: TARGET,
                reason: format!("invalid base url: {err}"),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ExternalError::NotConfigured {
                target: TARGET,
                reason: format!("{base_url} cannot carry a path"),
            });
        }

        Ok(Self {
            client: http_client(TARGET, config.timeout, headers)?,
            base_url,
            timeout: config.timeout,
        })
    }

    /// `{base}/document/{segments..}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("document").extend(segments);
        }
        url
    }
}

#[async_trait]
impl DocumentSource for ErpClient {
    async fn resolve(
        &self,
        doc_id: &str,
        requested_by: &str,
    ) -> Result<Option<SourceDocument>, ExternalError> {
        let resp = self
            .client
            .get(self.endpoint(&[doc_id]))
            .query(&[("userId", requested_by)])
            .send()
            .await
            .map_err(|err| transport_error(TARGET, self.timeout, err))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(ExternalError::Status {
                target: TARGET,
                status: resp.status().as_u16(),
            });
        }

        let doc = resp
            .json::<SourceDocument>()
            .await
            .map_err(|err| ExternalError::Decode {
                target: TARGET,
                reason: err.to_string(),
            })?;
        Ok(Some(doc))
    }
}

#[async_trait]
impl StatusSync for ErpClient {
    async fn notify(
        &self,
        doc_id: &str,
        status: DocStatus,
        acting_user_id: &str,
    ) -> Result<(), ExternalError> {
        let resp = self
            .client
            .post(self.endpoint(&["status"]))
            .json(&StatusUpdate {
                doc_id,
                status,
                user_id: acting_user_id,
            })
            .send()
            .await
            .map_err(|err| transport_error(TARGET, self.timeout, err))?;

        if !resp.status().is_success() {
            return Err(ExternalError::Status {
                target: TARGET,
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> Result<ErpClient, ExternalError> {
        ErpClient::new(ErpConfig {
            base_url: base_url.to_string(),
            prod_code: "PT".to_string(),
            token: "secret".to_string(),
            timeout: Duration::from_secs(5),
        })
    }

    #[test]
    fn document_id_stays_one_path_segment() {
        let erp = client("https://erp.example.com/api/").unwrap();

        let url = erp.endpoint(&["INV/1?x#y"]);
        assert_eq!(url.as_str(), "https://erp.example.com/api/document/INV%2F1%3Fx%23y");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn status_endpoint_sits_under_document() {
        let erp = client("https://erp.example.com/api").unwrap();
        assert_eq!(
            erp.endpoint(&["status"]).as_str(),
            "https://erp.example.com/api/document/status"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            client("not a url"),
            Err(ExternalError::NotConfigured { .. })
        ));
        assert!(matches!(
            client("mailto:erp@example.com"),
            Err(ExternalError::NotConfigured { .. })
        ));
    }
}
