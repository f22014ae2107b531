use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::store::{Store, StoreError};

pub const COOL_OFF_SECONDS_BTWN_DIFF_ROUTE_SCANS: &str = "COOL_OFF_SECONDS_BTWN_DIFF_ROUTE_SCANS";
pub const MINS_BETWEEN_LOCATION_HEARTBEATS: &str = "MINS_BETWEEN_LOCATION_HEARTBEATS";
pub const UPDATE_DOC_STATUS_TO_ERP: &str = "UPDATE_DOC_STATUS_TO_ERP";
pub const SEND_TRACKING_SMS: &str = "SEND_TRACKING_SMS";

struct Definition {
    name: &'static str,
    default: &'static str,
    accepts: fn(&str) -> bool,
}

static DEFINITIONS: [Definition; 4] = [
    Definition {
        name: COOL_OFF_SECONDS_BTWN_DIFF_ROUTE_SCANS,
        default: "120",
        accepts: cool_off_in_range,
    },
    Definition {
        name: MINS_BETWEEN_LOCATION_HEARTBEATS,
        default: "5",
        accepts: heartbeat_minutes_in_range,
    },
    Definition {
        name: UPDATE_DOC_STATUS_TO_ERP,
        default: "false",
        accepts: is_bool,
    },
    Definition {
        name: SEND_TRACKING_SMS,
        default: "false",
        accepts: is_bool,
    },
];

fn cool_off_in_range(value: &str) -> bool {
    int_in_range(value, 5, 600)
}

fn heartbeat_minutes_in_range(value: &str) -> bool {
    int_in_range(value, 1, 20)
}

fn is_bool(value: &str) -> bool {
    value.parse::<bool>().is_ok()
}

fn int_in_range(value: &str, min: i64, max: i64) -> bool {
    value
        .trim()
        .parse::<i64>()
        .is_ok_and(|n| (min..=max).contains(&n))
}

fn definition(name: &str) -> Option<&'static Definition> {
    DEFINITIONS.iter().find(|d| d.name == name)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingValue {
    pub name: String,
    pub value: String,
}

/// Read-through cache over the persisted settings rows.
pub struct SettingsCache {
    values: DashMap<String, String>,
}

impl SettingsCache {
    /// Seeds missing default rows into the store and loads every row.
    pub fn load(store: &Store) -> Result<Self, StoreError> {
        let rows = store.transaction(|t| {
            for def in DEFINITIONS.iter() {
                if t.setting(def.name).is_none() {
                    t.put_setting(def.name, def.default);
                }
            }
            Ok::<_, StoreError>(
                t.settings()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>(),
            )
        })?;

        let values = DashMap::new();
        for (name, value) in rows {
            values.insert(name, value);
        }
        tracing::info!(settings = values.len(), "settings loaded");
        Ok(Self { values })
    }

    pub fn get_setting(&self, name: &str) -> Result<SettingValue, AppError> {
        let value = self
            .values
            .get(name)
            .map(|v| v.value().clone())
            .or_else(|| definition(name).map(|d| d.default.to_string()))
            .ok_or_else(|| AppError::NotFound(format!("setting {name} not found")))?;

        Ok(SettingValue {
            name: name.to_string(),
            value,
        })
    }

    pub fn update_setting(
        &self,
        store: &Store,
        name: &str,
        value: &str,
    ) -> Result<SettingValue, AppError> {
        let def = definition(name)
            .ok_or_else(|| AppError::BadRequest(format!("unknown setting {name}")))?;
        let value = value.trim();
        if !(def.accepts)(value) {
            return Err(AppError::BadRequest(format!(
                "invalid value '{value}' for setting {name}"
            )));
        }

        store.transaction(|t| {
            t.put_setting(name, value);
            Ok::<_, StoreError>(())
        })?;
        self.values.insert(name.to_string(), value.to_string());

        tracing::info!(setting = name, value, "setting updated");
        Ok(SettingValue {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn cool_off_seconds(&self) -> i64 {
        self.parsed(COOL_OFF_SECONDS_BTWN_DIFF_ROUTE_SCANS, 120)
    }

    pub fn minutes_between_location_heartbeats(&self) -> i64 {
        self.parsed(MINS_BETWEEN_LOCATION_HEARTBEATS, 5)
    }

    pub fn update_status_to_external_system(&self) -> bool {
        self.parsed(UPDATE_DOC_STATUS_TO_ERP, false)
    }

    pub fn send_tracking_sms(&self) -> bool {
        self.parsed(SEND_TRACKING_SMS, false)
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str, fallback: T) -> T {
        self.values
            .get(name)
            .and_then(|v| v.value().trim().parse().ok())
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_defaults() {
        let store = Store::new();
        let cache = SettingsCache::load(&store).unwrap();

        assert_eq!(cache.cool_off_seconds(), 120);
        assert_eq!(cache.minutes_between_location_heartbeats(), 5);
        assert!(!cache.update_status_to_external_system());
        assert!(!cache.send_tracking_sms());
        let stored = store.read(|t| t.setting(SEND_TRACKING_SMS).map(str::to_string));
        assert_eq!(stored.as_deref(), Some("false"));
    }

    #[test]
    fn keeps_persisted_values_on_reload() {
        let store = Store::new();
        store
            .transaction(|t| {
                t.put_setting(COOL_OFF_SECONDS_BTWN_DIFF_ROUTE_SCANS, "30");
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let cache = SettingsCache::load(&store).unwrap();
        assert_eq!(cache.cool_off_seconds(), 30);
    }

    #[test]
    fn update_writes_through() {
        let store = Store::new();
        let cache = SettingsCache::load(&store).unwrap();

        cache.update_setting(&store, SEND_TRACKING_SMS, "true").unwrap();
        assert!(cache.send_tracking_sms());
        let stored = store.read(|t| t.setting(SEND_TRACKING_SMS).map(str::to_string));
        assert_eq!(stored.as_deref(), Some("true"));
    }

    #[test]
    fn rejects_out_of_range_and_unknown() {
        let store = Store::new();
        let cache = SettingsCache::load(&store).unwrap();

        let err = cache
            .update_setting(&store, COOL_OFF_SECONDS_BTWN_DIFF_ROUTE_SCANS, "4")
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(cache.update_setting(&store, MINS_BETWEEN_LOCATION_HEARTBEATS, "21").is_err());
        assert!(cache.update_setting(&store, UPDATE_DOC_STATUS_TO_ERP, "yes").is_err());
        assert!(matches!(
            cache.update_setting(&store, "NOPE", "1").unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(cache.get_setting("NOPE").unwrap_err(), AppError::NotFound(_)));
        assert_eq!(cache.cool_off_seconds(), 120);
    }

    #[test]
    fn unparsable_cached_value_falls_back() {
        let store = Store::new();
        store
            .transaction(|t| {
                t.put_setting(MINS_BETWEEN_LOCATION_HEARTBEATS, "often");
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let cache = SettingsCache::load(&store).unwrap();
        assert_eq!(cache.minutes_between_location_heartbeats(), 5);
    }
}
