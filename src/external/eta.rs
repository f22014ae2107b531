use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::{http_client, transport_error, EtaProvider, ExternalError};
use crate::models::location::GeoPoint;

const TARGET: &str = "eta";

#[derive(Debug)]
pub struct HttpEtaProvider {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EtaResponse {
    duration_minutes: Option<f64>,
}

impl HttpEtaProvider {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ExternalError> {
        Ok(Self {
            client: http_client(TARGET, timeout, HeaderMap::new())?,
            url: url.to_string(),
            timeout,
        })
    }
}

fn coordinate(point: GeoPoint) -> String {
    format!("{},{}", point.lat, point.lng)
}

#[async_trait]
impl EtaProvider for HttpEtaProvider {
    async fn estimate(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Option<i64>, ExternalError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("origin", coordinate(origin)),
                ("destination", coordinate(destination)),
            ])
            .send()
            .await
            .map_err(|err| transport_error(TARGET, self.timeout, err))?;

        if !resp.status().is_success() {
            return Err(ExternalError::Status {
                target: TARGET,
                status: resp.status().as_u16(),
            });
        }

        let body = resp
            .json::<EtaResponse>()
            .await
            .map_err(|err| ExternalError::Decode {
                target: TARGET,
                reason: err.to_string(),
            })?;
        Ok(body.duration_minutes.map(|m| m.round() as i64))
    }
}
