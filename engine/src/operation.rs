//! Pending mutations queued for replay against the remote.
//!
//! Every local change is recorded as a mutation carrying a full copy of the
//! record. The queue is drained FIFO by the [`Replayer`](crate::Replayer).

use crate::{Record, RecordId};
use serde::{Deserialize, Serialize};

/// Kind of queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

/// A local mutation waiting to be pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMutation {
    /// What happened
    pub operation: MutationKind,
    /// Record state at the time of the mutation
    pub record: Record,
}

impl PendingMutation {
    /// Queue a creation.
    pub fn create(record: Record) -> Self {
        Self {
            operation: MutationKind::Create,
            record,
        }
    }

    /// Queue an update.
    pub fn update(record: Record) -> Self {
        Self {
            operation: MutationKind::Update,
            record,
        }
    }

    /// Queue a deletion.
    pub fn delete(record: Record) -> Self {
        Self {
            operation: MutationKind::Delete,
            record,
        }
    }

    /// Get the record ID this mutation targets.
    pub fn record_id(&self) -> &RecordId {
        &self.record.id
    }

    /// Whether this mutation carries an edit of the record's content.
    pub fn is_edit(&self) -> bool {
        matches!(self.operation, MutationKind::Create | MutationKind::Update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        let record = Record::new_local("a", "b", "c", 1000);

        assert_eq!(
            PendingMutation::create(record.clone()).operation,
            MutationKind::Create
        );
        assert_eq!(
            PendingMutation::update(record.clone()).operation,
            MutationKind::Update
        );
        let delete = PendingMutation::delete(record.clone());
        assert_eq!(delete.operation, MutationKind::Delete);
        assert_eq!(delete.record_id(), &record.id);
    }

    #[test]
    fn edits() {
        let record = Record::new_local("a", "b", "c", 1000);
        assert!(PendingMutation::create(record.clone()).is_edit());
        assert!(PendingMutation::update(record.clone()).is_edit());
        assert!(!PendingMutation::delete(record).is_edit());
    }

    #[test]
    fn serialization_format() {
        let record = Record::new_remote("srv-1", "Hello", "User 1", 1000);
        let json = serde_json::to_string(&PendingMutation::update(record)).unwrap();
        assert!(json.contains("\"operation\":\"update\""));

        let parsed: PendingMutation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.operation, MutationKind::Update);
    }
}
