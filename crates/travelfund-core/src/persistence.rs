//! Snapshot persistence.
//!
//! The complete application state is one JSON document stored under
//! [`STORE_KEY`]. Saves overwrite it wholesale. Loads never fail: a missing,
//! unreadable or malformed document yields defaults and a warning.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ledger::HistoryRecord;
use crate::storage::KvStore;

pub const STORE_KEY: &str = "kawaii-starter-data";
pub const EXPORT_MIME_TYPE: &str = "application/json";
pub const DEFAULT_TARGET: i64 = 5000;
/// Pledge assumed for a stored session saved without `pledgeAmount`.
pub const DEFAULT_PLEDGE: i64 = 10;

/// Everything that survives a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSnapshot {
    pub fund: i64,
    pub target: i64,
    pub success_count: u32,
    pub spins_available: u32,
    /// Newest first.
    pub records: Vec<HistoryRecord>,
    /// Epoch milliseconds; present only while a session is running.
    pub session_start_time: Option<i64>,
    /// Amount held for the running session.
    pub pledge_amount: Option<i64>,
}

impl AppSnapshot {
    /// The pledge held for the stored session, if one is running.
    pub fn held_pledge(&self) -> Option<i64> {
        self.session_start_time
            .map(|_| self.pledge_amount.unwrap_or(DEFAULT_PLEDGE))
    }
}

impl Default for AppSnapshot {
    fn default() -> Self {
        Self {
            fund: 0,
            target: DEFAULT_TARGET,
            success_count: 0,
            spins_available: 0,
            records: Vec::new(),
            session_start_time: None,
            pledge_amount: None,
        }
    }
}

/// A backup ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

pub struct SnapshotStore<S> {
    store: S,
    key: String,
}

impl<S: KvStore> SnapshotStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, STORE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Serialize and overwrite the stored snapshot.
    pub fn save(&mut self, snapshot: &AppSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        self.store.set(&self.key, &json)?;
        tracing::debug!(key = %self.key, bytes = json.len(), "snapshot saved");
        Ok(())
    }

    /// Last saved snapshot, or defaults.
    pub fn load(&self) -> AppSnapshot {
        match self.fetch() {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "unreadable snapshot, using defaults");
                AppSnapshot::default()
            }
        }
    }

    /// Last saved snapshot, `None` if nothing was saved. Unlike
    /// [`SnapshotStore::load`], read and parse failures are errors.
    pub fn fetch(&self) -> Result<Option<AppSnapshot>> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// The stored bytes verbatim, named for `date`. `None` if nothing was saved.
    pub fn export_snapshot(&self, date: NaiveDate) -> Result<Option<ExportFile>> {
        let Some(contents) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        Ok(Some(ExportFile {
            file_name: export_file_name(date),
            mime_type: EXPORT_MIME_TYPE,
            contents,
        }))
    }
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("travel-fund-backup-{}.json", date.format("%Y-%m-%d"))
}
