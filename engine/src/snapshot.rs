//! Snapshot types for exporting and importing engine state.
//!
//! A snapshot carries all four persisted collections. It is the payload of
//! the UI's export/import buttons and is serialized as deterministic JSON.

use crate::{error::Result, Error, LocalState, PendingMutation, Record, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of local state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// When the snapshot was taken
    pub exported_at: Timestamp,
    pub records: Vec<Record>,
    pub pending: Vec<PendingMutation>,
    pub shadow: Vec<Record>,
    pub last_sync: Option<Timestamp>,
}

impl StateSnapshot {
    /// Capture `state` at `exported_at`.
    pub fn capture(state: &LocalState, exported_at: Timestamp) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            exported_at,
            records: state.records.clone(),
            pending: state.pending.iter().cloned().collect(),
            shadow: state.shadow.clone(),
            last_sync: state.last_sync,
        }
    }

    /// Turn the snapshot back into engine state.
    pub fn into_state(self) -> LocalState {
        LocalState {
            records: self.records,
            pending: self.pending.into(),
            shadow: self.shadow,
            last_sync: self.last_sync,
        }
    }

    /// Check structural invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::Parse(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        let mut seen = HashSet::new();
        for record in &self.records {
            if record.id.trim().is_empty() {
                return Err(Error::Parse("record with empty id".into()));
            }
            if !seen.insert(record.id.as_str()) {
                return Err(Error::Parse(format!("duplicate record id: {}", record.id)));
            }
        }

        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Serialize to pretty JSON, as written by the export button.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Deserialize and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
