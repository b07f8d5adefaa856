//! Reconciliation of a pulled remote page against local state.
//!
//! Three-way comparison: the remote page as fetched now, the shadow (what
//! the remote looked like after the previous successful sync) and the local
//! records. The default policy is server-wins; whenever the server changed a
//! record the user also has a queued edit for, the record is additionally
//! flagged and a [`Conflict`] is reported for manual override.
//!
//! # Classification
//!
//! | in shadow | in local | pending edit | action |
//! |---|---|---|---|
//! | no  | no  | -   | insert remote |
//! | no  | yes | yes | flag, keep local, report conflict |
//! | no  | yes | no  | overwrite with remote |
//! | yes | no  | -   | re-insert remote |
//! | yes | yes, remote unchanged | - | nothing |
//! | yes | yes, remote changed | yes | overwrite with remote, flag, report conflict |
//! | yes | yes, remote changed | no  | overwrite with remote |
//!
//! "Changed" compares record content (see [`Record::same_content`]), never
//! timestamps. Reconciliation does not touch the shadow or the queue.

use crate::{LocalState, Record, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// What reconciliation did to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// New on the server, inserted locally
    Inserted,
    /// Server value overwrote the local one
    Updated,
    /// Deleted locally but still on the server, re-inserted
    Restored,
    /// Unknown to the shadow but edited locally; local value kept and flagged
    ConflictKeptLocal,
    /// Changed on both sides; server value stored and flagged
    ConflictServerWins,
}

impl ChangeKind {
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ChangeKind::ConflictKeptLocal | ChangeKind::ConflictServerWins
        )
    }
}

/// A classified change applied to local state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub id: RecordId,
    pub kind: ChangeKind,
    /// Text of the record as stored after the change
    pub text: String,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ChangeKind::Inserted => write!(f, "New quote from server: \"{}\"", self.text),
            ChangeKind::Updated => write!(f, "Server updated quote {}: \"{}\"", self.id, self.text),
            ChangeKind::Restored => write!(f, "Server restored deleted quote {}", self.id),
            ChangeKind::ConflictKeptLocal => write!(
                f,
                "Conflict on quote {}: local version kept, review to resolve",
                self.id
            ),
            ChangeKind::ConflictServerWins => write!(
                f,
                "Conflict on quote {}: server version applied, review to override",
                self.id
            ),
        }
    }
}

/// A detected conflict, kept for manual resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: RecordId,
    /// The user's value before reconciliation
    pub local: Record,
    /// The value the server reported
    pub remote: Record,
    pub detected_at: Timestamp,
}

/// Result of reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    /// Every change applied, in remote order
    pub changes: Vec<Change>,
    /// Conflicts detected in this pass
    pub conflicts: Vec<Conflict>,
}

impl ReconcileResult {
    /// Whether local state was left untouched.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Merges a remote page into local state.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    detected_at: Timestamp,
}

impl Reconciler {
    /// Create a reconciler stamping conflicts with `detected_at`.
    pub fn new(detected_at: Timestamp) -> Self {
        Self { detected_at }
    }

    /// Classify every remote item and apply the resulting action to `state`.
    pub fn reconcile(&self, remote: &[Record], state: &mut LocalState) -> ReconcileResult {
        let mut result = ReconcileResult::default();

        for incoming in remote {
            let id = incoming.id.as_str();
            let pending_edit = state.has_pending_edit(id);
            let shadow = state.shadow_entry(id).cloned();
            let local = state.record(id).cloned();

            let kind = match (shadow, local) {
                (None, None) => {
                    state.upsert_record(incoming.clone());
                    Some(ChangeKind::Inserted)
                }
                (None, Some(local)) if pending_edit => {
                    self.flag_kept_local(state, local, incoming, &mut result);
                    Some(ChangeKind::ConflictKeptLocal)
                }
                (None, Some(local)) => {
                    if local.same_content(incoming) {
                        None
                    } else {
                        state.upsert_record(incoming.clone());
                        Some(ChangeKind::Updated)
                    }
                }
                (Some(_), None) => {
                    state.upsert_record(incoming.clone());
                    Some(ChangeKind::Restored)
                }
                (Some(shadow), Some(_)) if shadow.same_content(incoming) => None,
                (Some(_), Some(local)) if pending_edit => {
                    self.flag_server_wins(state, local, incoming, &mut result);
                    Some(ChangeKind::ConflictServerWins)
                }
                (Some(_), Some(_)) => {
                    state.upsert_record(incoming.clone());
                    Some(ChangeKind::Updated)
                }
            };

            if let Some(kind) = kind {
                debug!(id, ?kind, "reconciled");
                let text = state
                    .record(id)
                    .map(|r| r.text.clone())
                    .unwrap_or_default();
                result.changes.push(Change {
                    id: incoming.id.clone(),
                    kind,
                    text,
                });
            }
        }

        result
    }

    fn flag_kept_local(
        &self,
        state: &mut LocalState,
        local: Record,
        incoming: &Record,
        result: &mut ReconcileResult,
    ) {
        if let Some(record) = state.record_mut(&incoming.id) {
            record.conflicted = true;
        }
        result.conflicts.push(self.conflict(local, incoming));
    }

    fn flag_server_wins(
        &self,
        state: &mut LocalState,
        local: Record,
        incoming: &Record,
        result: &mut ReconcileResult,
    ) {
        let mut flagged = incoming.clone();
        flagged.conflicted = true;
        state.upsert_record(flagged);
        result.conflicts.push(self.conflict(local, incoming));
    }

    fn conflict(&self, mut local: Record, incoming: &Record) -> Conflict {
        local.conflicted = false;
        Conflict {
            id: incoming.id.clone(),
            local,
            remote: incoming.clone(),
            detected_at: self.detected_at,
        }
    }
}
