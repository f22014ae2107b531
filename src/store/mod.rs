//! In-memory relational store.
//!
//! Relational tables sit behind one lock and are only mutated through
//! [`Store::transaction`], which runs against a working copy and publishes it
//! only when the closure succeeds. Append-only series (location heartbeats,
//! tracking access log) live outside the transactional tables.

mod tables;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;

use crate::models::document::TrackingAccess;
use crate::models::location::LocationHeartbeat;

pub use tables::{NewTrip, Tables};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("duplicate key '{key}' in {table}")]
    DuplicateKey { table: &'static str, key: String },

    #[error("{table} row references missing {referenced} '{key}'")]
    ForeignKey {
        table: &'static str,
        referenced: &'static str,
        key: String,
    },

    #[error("{table} row '{key}' does not exist")]
    MissingRow { table: &'static str, key: String },

    #[error("{table} row '{key}' violates constraint: {reason}")]
    Constraint {
        table: &'static str,
        key: String,
        reason: String,
    },
}

#[derive(Default)]
pub struct Store {
    tables: RwLock<Tables>,
    heartbeats: RwLock<Vec<LocationHeartbeat>>,
    tracking_access: RwLock<Vec<TrackingAccess>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let tables = self.tables.read();
        f(&tables)
    }

    /// Runs `f` atomically. Nothing `f` wrote is visible unless it returns `Ok`.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&mut Tables) -> Result<T, E>) -> Result<T, E> {
        let mut committed = self.tables.write();
        let mut working = committed.clone();
        let out = f(&mut working)?;
        *committed = working;
        Ok(out)
    }

    pub fn append_heartbeat(&self, heartbeat: LocationHeartbeat) {
        self.heartbeats.write().push(heartbeat);
    }

    /// Most recent heartbeat of `user_id`, optionally no older than `since`.
    pub fn latest_heartbeat(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Option<LocationHeartbeat> {
        self.heartbeats
            .read()
            .iter()
            .filter(|hb| hb.user_id == user_id)
            .filter(|hb| since.is_none_or(|since| hb.received_at >= since))
            .max_by_key(|hb| hb.received_at)
            .cloned()
    }

    /// Heartbeats of `user_id` received strictly after `since`, newest first.
    pub fn heartbeats_after(&self, user_id: &str, since: DateTime<Utc>) -> Vec<LocationHeartbeat> {
        let mut found: Vec<LocationHeartbeat> = self
            .heartbeats
            .read()
            .iter()
            .filter(|hb| hb.user_id == user_id && hb.received_at > since)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        found
    }

    pub fn record_tracking_access(&self, access: TrackingAccess) -> Result<(), StoreError> {
        let known = self.read(|t| t.document(&access.doc_id).is_some());
        if !known {
            return Err(StoreError::ForeignKey {
                table: "doc_tracking_access",
                referenced: "doc",
                key: access.doc_id,
            });
        }
        self.tracking_access.write().push(access);
        Ok(())
    }

    pub fn tracking_accesses(&self, doc_id: &str) -> Vec<TrackingAccess> {
        self.tracking_access
            .read()
            .iter()
            .filter(|a| a.doc_id == doc_id)
            .cloned()
            .collect()
    }
}
