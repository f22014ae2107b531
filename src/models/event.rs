use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Document,
    Trip,
}

/// A committed status change, broadcast to websocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub entity: EntityKind,
    pub id: String,
    pub status: String,
    pub actor: String,
    pub at: DateTime<Utc>,
}
