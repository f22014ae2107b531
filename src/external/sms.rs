use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Url;

use super::{http_client, transport_error, ExternalError, SmsSender};

const TARGET: &str = "sms";

#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Gateway URL with `{apikey}`, `{recipientMobileNumber}` and
    /// `{smsTemplateName}` placeholders.
    pub url_template: String,
    pub api_key: String,
    pub template_name: String,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct HttpSmsSender {
    client: reqwest::Client,
    config: SmsConfig,
}

impl HttpSmsSender {
    pub fn new(config: SmsConfig) -> Result<Self, ExternalError> {
        Ok(Self {
            client: http_client(TARGET, config.timeout, HeaderMap::new())?,
            config,
        })
    }

    fn tracking_url(&self, phone: &str, doc_id: &str, token: &str) -> Result<Url, ExternalError> {
        let raw = self
            .config
            .url_template
            .replace("{apikey}", &self.config.api_key)
            .replace("{recipientMobileNumber}", phone)
            .replace("{smsTemplateName}", &self.config.template_name);

        let mut url = Url::parse(&raw).map_err(|err| ExternalError::NotConfigured {
            target: TARGET,
            reason: format!("invalid url template: {err}"),
        })?;
        url.query_pairs_mut()
            .append_pair("var1", doc_id)
            .append_pair("var2", token);
        Ok(url)
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send_tracking_link(
        &self,
        phone: &str,
        doc_id: &str,
        token: &str,
    ) -> Result<(), ExternalError> {
        let url = self.tracking_url(phone, doc_id, token)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| transport_error(TARGET, self.config.timeout, err))?;

        if !resp.status().is_success() {
            return Err(ExternalError::Status {
                target: TARGET,
                status: resp.status().as_u16(),
            });
        }
        tracing::info!(doc_id, "tracking sms sent");
        Ok(())
    }
}
