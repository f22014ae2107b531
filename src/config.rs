use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub app_env: String,
    pub erp_api_base_url: Option<String>,
    pub erp_api_prod_code: Option<String>,
    pub erp_api_token: Option<String>,
    pub eta_api_url: Option<String>,
    pub sms_url_template: Option<String>,
    pub sms_api_key: Option<String>,
    pub track_sms_template: Option<String>,
    pub outbound_timeout_secs: u64,
    /// Seeds an administrator with this id at startup.
    pub bootstrap_admin_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let log_format = match optional("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") | None => LogFormat::Compact,
            Some(other) => {
                return Err(AppError::Internal(format!("invalid LOG_FORMAT: {other}")));
            }
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,
            event_buffer_size: non_zero(
                "EVENT_BUFFER_SIZE",
                parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            )?,
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            erp_api_base_url: optional("ERP_API_BASE_URL"),
            erp_api_prod_code: optional("ERP_API_PROD_CODE"),
            erp_api_token: optional("ERP_API_TOKEN"),
            eta_api_url: optional("ETA_API_URL"),
            sms_url_template: optional("SMS_URL_TEMPLATE"),
            sms_api_key: optional("SMS_API_KEY"),
            track_sms_template: optional("TRACK_SMS_TEMPLATE"),
            outbound_timeout_secs: parse_or_default("OUTBOUND_TIMEOUT_SECS", 5)?,
            bootstrap_admin_id: optional("BOOTSTRAP_ADMIN_ID"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

/// A set, non-blank variable.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

/// Rejects sizes the runtime cannot work with, such as an empty channel.
fn non_zero(key: &str, value: usize) -> Result<usize, AppError> {
    if value == 0 {
        return Err(AppError::Internal(format!("invalid {key}: must be at least 1")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_rejected() {
        let err = non_zero("EVENT_BUFFER_SIZE", 0).unwrap_err();
        assert!(err.to_string().contains("EVENT_BUFFER_SIZE"));
        assert_eq!(non_zero("EVENT_BUFFER_SIZE", 16).unwrap(), 16);
    }
}
