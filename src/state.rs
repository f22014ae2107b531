use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::AppError;
use crate::external::mock_source::MockDocumentSource;
use crate::external::notify::Notifier;
use crate::external::Collaborators;
use crate::models::event::{EntityKind, StatusEvent};
use crate::observability::metrics::Metrics;
use crate::settings::SettingsCache;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct StateOptions {
    pub event_buffer_size: usize,
    pub outbound_timeout: Duration,
    /// Send tracking SMS to the acting user instead of the customer.
    pub redirect_sms_to_caller: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            event_buffer_size: 1024,
            outbound_timeout: Duration::from_secs(5),
            redirect_sms_to_caller: true,
        }
    }
}

impl StateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            event_buffer_size: config.event_buffer_size,
            outbound_timeout: Duration::from_secs(config.outbound_timeout_secs),
            redirect_sms_to_caller: !config.is_production(),
        }
    }
}

pub struct AppState {
    pub store: Store,
    pub settings: SettingsCache,
    pub mock_docs: MockDocumentSource,
    pub collaborators: Collaborators,
    pub notifier: Notifier,
    pub status_events_tx: broadcast::Sender<StatusEvent>,
    pub metrics: Metrics,
    pub outbound_timeout: Duration,
    pub redirect_sms_to_caller: bool,
}

impl AppState {
    pub fn new(collaborators: Collaborators, options: StateOptions) -> Result<Self, AppError> {
        if options.event_buffer_size == 0 {
            return Err(AppError::Internal(
                "event buffer size must be at least 1".to_string(),
            ));
        }
        let store = Store::new();
        let settings = SettingsCache::load(&store)?;
        let metrics = Metrics::new();
        let (status_events_tx, _unused_rx) = broadcast::channel(options.event_buffer_size);
        let notifier = Notifier::new(
            collaborators.status_sync.clone(),
            collaborators.sms.clone(),
            metrics.clone(),
            options.outbound_timeout,
        );

        Ok(Self {
            store,
            settings,
            mock_docs: MockDocumentSource::new(),
            collaborators,
            notifier,
            status_events_tx,
            metrics,
            outbound_timeout: options.outbound_timeout,
            redirect_sms_to_caller: options.redirect_sms_to_caller,
        })
    }

    pub fn publish(&self, entity: EntityKind, id: impl ToString, status: &str, actor: &str) {
        let _ = self.status_events_tx.send(StatusEvent {
            entity,
            id: id.to_string(),
            status: status.to_string(),
            actor: actor.to_string(),
            at: Utc::now(),
        });
    }
}
