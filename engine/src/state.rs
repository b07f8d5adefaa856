//! In-memory view of the four persisted collections.

use crate::{Conflict, MutationKind, PendingMutation, Record, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// The engine's working copy of local state.
///
/// Mirrors the persisted layout one-to-one: records, pending queue,
/// remote shadow and the last successful sync time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    /// Records as the user sees them
    pub records: Vec<Record>,
    /// Mutations not yet pushed, oldest first
    pub pending: VecDeque<PendingMutation>,
    /// Remote collection as of the last successful sync
    pub shadow: Vec<Record>,
    /// Completion time of the last successful sync
    pub last_sync: Option<Timestamp>,
}

impl LocalState {
    /// Get a record by ID.
    pub fn record(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Get a mutable record by ID.
    pub fn record_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// Replace the record with the same id, or append it.
    pub fn upsert_record(&mut self, record: Record) {
        match self.record_mut(&record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Remove a record, returning it.
    pub fn remove_record(&mut self, id: &str) -> Option<Record> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    /// Get the shadow entry for an id.
    pub fn shadow_entry(&self, id: &str) -> Option<&Record> {
        self.shadow.iter().find(|r| r.id == id)
    }

    /// Replace or append a shadow entry. The conflict flag is never shadowed.
    pub fn upsert_shadow(&mut self, mut record: Record) {
        record.conflicted = false;
        match self.shadow.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.shadow.push(record),
        }
    }

    /// Drop a shadow entry. Returns whether one was present.
    pub fn remove_shadow(&mut self, id: &str) -> bool {
        let before = self.shadow.len();
        self.shadow.retain(|r| r.id != id);
        self.shadow.len() != before
    }

    /// Whether a queued create or update targets this id.
    pub fn has_pending_edit(&self, id: &str) -> bool {
        self.pending
            .iter()
            .any(|m| m.is_edit() && m.record.id == id)
    }

    /// Append a mutation to the queue.
    pub fn enqueue(&mut self, operation: MutationKind, record: Record) {
        self.pending.push_back(PendingMutation { operation, record });
    }

    /// Rebuild a [`Conflict`] for every flagged record.
    ///
    /// The stored record is the remote value. The user's value is the newest
    /// queued edit for the id. Once that edit has been pushed it survives only
    /// in the shadow, which is used when it differs from the stored record.
    /// Detection time is the flagged record's `updated_at`.
    pub fn flagged_conflicts(&self) -> Vec<Conflict> {
        self.records
            .iter()
            .filter(|r| r.conflicted)
            .map(|flagged| {
                let mut remote = flagged.clone();
                remote.conflicted = false;

                let queued = self
                    .pending
                    .iter()
                    .rev()
                    .find(|m| m.is_edit() && m.record.id == flagged.id)
                    .map(|m| &m.record);
                let pushed = self
                    .shadow_entry(&flagged.id)
                    .filter(|shadowed| !shadowed.same_content(flagged));
                let mut local = queued.or(pushed).unwrap_or(&remote).clone();
                local.conflicted = false;

                Conflict {
                    id: flagged.id.clone(),
                    local,
                    remote,
                    detected_at: flagged.updated_at,
                }
            })
            .collect()
    }

    /// Rewrite `old_id` to `new_id` in the records and every queued mutation.
    ///
    /// Returns the promoted record if it was still present locally.
    pub fn promote(&mut self, old_id: &str, new_id: &RecordId) -> Option<Record> {
        for mutation in self.pending.iter_mut().filter(|m| m.record.id == old_id) {
            mutation.record.promote(new_id.clone());
        }

        let record = self.record_mut(old_id)?;
        record.promote(new_id.clone());
        Some(record.clone())
    }
}
