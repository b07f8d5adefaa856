//! Mutation Queue Replayer - pushes queued local mutations to the remote.
//!
//! The queue is drained strictly FIFO, one mutation at a time. A mutation
//! leaves the queue only after its push succeeded and its effect on local
//! state (promotion, shadow update) has been applied and persisted. The
//! first failed push stops the drain and leaves that mutation and everything
//! behind it queued in the original order.

use crate::{
    error::Result, LocalState, MutationKind, PendingMutation, RecordId, RemoteClient,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Remote acknowledgement of a single push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// The remote assigned a new identity to a locally created record
    Created(RecordId),
    /// Content accepted, nothing to rewrite
    Pushed,
    /// No remote call was needed
    Skipped,
}

/// Local effect of an applied mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Applied {
    /// Local id rewritten to the remote one
    Promoted { from: RecordId, to: RecordId },
    /// Shadow entry added or replaced
    Shadowed { id: RecordId },
    /// Shadow entry removed (or was already absent)
    Unshadowed { id: RecordId },
}

/// Summary of a drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub applied: Vec<Applied>,
}

impl DrainReport {
    /// Number of mutations removed from the queue.
    pub fn drained(&self) -> usize {
        self.applied.len()
    }
}

/// Replays queued mutations against a [`RemoteClient`].
pub struct Replayer<'a, R: ?Sized> {
    remote: &'a R,
}

impl<'a, R: RemoteClient + ?Sized> Replayer<'a, R> {
    pub fn new(remote: &'a R) -> Self {
        Self { remote }
    }

    /// Perform the remote side of one mutation.
    pub async fn push(&self, mutation: &PendingMutation) -> Result<Ack> {
        match mutation.operation {
            MutationKind::Create if mutation.record.is_local_id() => {
                let id = self.remote.create_remote(&mutation.record).await?;
                Ok(Ack::Created(id))
            }
            MutationKind::Create => Ok(Ack::Skipped),
            MutationKind::Update => {
                self.remote.push_update(&mutation.record).await?;
                Ok(Ack::Pushed)
            }
            // The remote offers no delete; the shadow alone tracks it.
            MutationKind::Delete => Ok(Ack::Skipped),
        }
    }

    /// Apply the local effect of an acknowledged mutation.
    ///
    /// The mutation must already be removed from the queue so that promotion
    /// only rewrites the entries behind it.
    pub fn apply(state: &mut LocalState, mutation: &PendingMutation, ack: Ack) -> Applied {
        match (mutation.operation, ack) {
            (MutationKind::Create, Ack::Created(new_id)) => {
                let old_id = mutation.record.id.clone();
                let shadowed = state.promote(&old_id, &new_id).unwrap_or_else(|| {
                    let mut record = mutation.record.clone();
                    record.promote(new_id.clone());
                    record
                });
                state.upsert_shadow(shadowed);
                Applied::Promoted {
                    from: old_id,
                    to: new_id,
                }
            }
            (MutationKind::Delete, _) => {
                state.remove_shadow(&mutation.record.id);
                Applied::Unshadowed {
                    id: mutation.record.id.clone(),
                }
            }
            (MutationKind::Create | MutationKind::Update, _) => {
                state.upsert_shadow(mutation.record.clone());
                Applied::Shadowed {
                    id: mutation.record.id.clone(),
                }
            }
        }
    }

    /// Drain the queue held in `state`, calling `persist` after every step.
    ///
    /// The lock is never held across a remote call, so mutations enqueued
    /// while the drain runs are picked up in order before it returns.
    pub async fn drain<F>(&self, state: &Mutex<LocalState>, persist: F) -> Result<DrainReport>
    where
        F: FnMut(&LocalState) -> Result<()>,
    {
        self.drain_with(state, persist, |_| ()).await
    }

    /// Like [`drain`](Self::drain), also calling `stepped` once each applied
    /// mutation is persisted. `stepped` runs with the state unlocked.
    pub async fn drain_with<F, S>(
        &self,
        state: &Mutex<LocalState>,
        mut persist: F,
        mut stepped: S,
    ) -> Result<DrainReport>
    where
        F: FnMut(&LocalState) -> Result<()>,
        S: FnMut(&Applied),
    {
        let mut report = DrainReport::default();

        loop {
            let Some(mutation) = state.lock().pending.front().cloned() else {
                break;
            };

            let ack = match self.push(&mutation).await {
                Ok(ack) => ack,
                Err(e) => {
                    let remaining = state.lock().pending.len();
                    warn!(
                        id = %mutation.record.id,
                        operation = ?mutation.operation,
                        remaining,
                        error = %e,
                        "push failed, leaving queue intact"
                    );
                    return Err(e);
                }
            };

            let applied = {
                let mut guard = state.lock();
                guard.pending.pop_front();
                let applied = Self::apply(&mut *guard, &mutation, ack);
                debug!(?applied, "mutation replayed");
                persist(&*guard)?;
                applied
            };
            stepped(&applied);
            report.applied.push(applied);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Origin, Record};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Remote that assigns sequential ids and fails pushes for chosen ids.
    #[derive(Default)]
    struct FakeRemote {
        next_id: AtomicU64,
        fail_for: Option<RecordId>,
        pushes: Mutex<Vec<RecordId>>,
    }

    impl FakeRemote {
        fn failing_for(id: &str) -> Self {
            Self {
                fail_for: Some(id.to_string()),
                ..Self::default()
            }
        }

        fn check(&self, record: &Record) -> Result<()> {
            self.pushes.lock().push(record.id.clone());
            if self.fail_for.as_deref() == Some(record.id.as_str()) {
                return Err(Error::Transport("503 Service Unavailable".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RemoteClient for FakeRemote {
        async fn fetch_remote(&self) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }

        async fn create_remote(&self, record: &Record) -> Result<RecordId> {
            self.check(record)?;
            Ok(format!("srv-{}", 101 + self.next_id.fetch_add(1, Ordering::SeqCst)))
        }

        async fn push_update(&self, record: &Record) -> Result<()> {
            self.check(record)
        }
    }

    fn record(id: &str, text: &str) -> Record {
        let mut record = Record::new_local(text, "Author", "Life", 1000);
        record.id = id.to_string();
        if !record.is_local_id() {
            record.origin = Origin::Remote;
        }
        record
    }

    #[tokio::test]
    async fn local_create_is_promoted() {
        let remote = FakeRemote::default();
        let mine = record("loc-1", "Mine");
        let mut state = LocalState::default();
        state.upsert_record(mine.clone());
        state.enqueue(MutationKind::Create, mine.clone());
        let mut edited = mine.clone();
        edited.edit("Mine v2", "Author", "Life", 2000);
        state.upsert_record(edited.clone());
        state.enqueue(MutationKind::Update, edited);
        let state = Mutex::new(state);

        let report = Replayer::new(&remote)
            .drain(&state, |_| Ok(()))
            .await
            .unwrap();

        let state = state.into_inner();
        assert_eq!(report.drained(), 2);
        assert_eq!(
            report.applied[0],
            Applied::Promoted {
                from: "loc-1".into(),
                to: "srv-101".into()
            }
        );
        assert_eq!(state.records.len(), 1);
        assert_eq!(state.records[0].id, "srv-101");
        assert_eq!(state.records[0].origin, Origin::Remote);
        assert!(state.pending.is_empty());
        assert_eq!(state.shadow_entry("srv-101").unwrap().text, "Mine v2");
        // The queued update was pushed under its promoted id.
        assert_eq!(*remote.pushes.lock(), vec!["loc-1", "srv-101"]);
    }

    #[tokio::test]
    async fn remote_create_only_upserts_shadow() {
        let remote = FakeRemote::default();
        let theirs = record("srv-5", "Theirs");
        let mut state = LocalState::default();
        state.enqueue(MutationKind::Create, theirs);
        let state = Mutex::new(state);

        Replayer::new(&remote).drain(&state, |_| Ok(())).await.unwrap();

        let state = state.into_inner();
        assert!(state.shadow_entry("srv-5").is_some());
        assert!(remote.pushes.lock().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_shadow_without_remote_call() {
        let remote = FakeRemote::default();
        let theirs = record("srv-5", "Theirs");
        let mut state = LocalState::default();
        state.upsert_shadow(theirs.clone());
        state.enqueue(MutationKind::Delete, theirs);
        let state = Mutex::new(state);

        Replayer::new(&remote).drain(&state, |_| Ok(())).await.unwrap();

        let state = state.into_inner();
        assert!(state.shadow.is_empty());
        assert!(remote.pushes.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_push_leaves_queue_unchanged() {
        let remote = FakeRemote::failing_for("srv-a");
        let mut state = LocalState::default();
        state.enqueue(MutationKind::Update, record("srv-a", "A"));
        state.enqueue(MutationKind::Delete, record("srv-b", "B"));
        state.enqueue(MutationKind::Create, record("loc-c", "C"));
        let before: VecDeque<_> = state.pending.clone();
        let state = Mutex::new(state);

        let err = Replayer::new(&remote)
            .drain(&state, |_| Ok(()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(state.lock().pending, before);
    }

    #[tokio::test]
    async fn failure_midway_keeps_suffix_in_order() {
        let remote = FakeRemote::failing_for("srv-b");
        let mut state = LocalState::default();
        state.enqueue(MutationKind::Update, record("srv-a", "A"));
        state.enqueue(MutationKind::Update, record("srv-b", "B"));
        state.enqueue(MutationKind::Delete, record("srv-c", "C"));
        let state = Mutex::new(state);
        let mut persisted = 0;

        Replayer::new(&remote)
            .drain(&state, |_| {
                persisted += 1;
                Ok(())
            })
            .await
            .unwrap_err();

        let state = state.into_inner();
        let ids: Vec<_> = state.pending.iter().map(|m| m.record.id.as_str()).collect();
        assert_eq!(ids, vec!["srv-b", "srv-c"]);
        assert!(state.shadow_entry("srv-a").is_some());
        assert_eq!(persisted, 1);
    }

    #[tokio::test]
    async fn every_step_is_reported_after_it_is_persisted() {
        let remote = FakeRemote::default();
        let mut state = LocalState::default();
        let mine = record("loc-1", "Mine");
        state.upsert_record(mine.clone());
        state.enqueue(MutationKind::Create, mine);
        state.enqueue(MutationKind::Delete, record("srv-b", "B"));
        let state = Mutex::new(state);
        let persisted = Mutex::new(0);
        let mut steps = Vec::new();

        Replayer::new(&remote)
            .drain_with(
                &state,
                |_| {
                    *persisted.lock() += 1;
                    Ok(())
                },
                |applied| {
                    // Unlocked: the step can be observed from outside.
                    let ids: Vec<_> = state.lock().records.iter().map(|r| r.id.clone()).collect();
                    steps.push((applied.clone(), *persisted.lock(), ids));
                },
            )
            .await
            .unwrap();

        assert_eq!(steps.len(), 2);
        assert!(matches!(steps[0].0, Applied::Promoted { .. }));
        assert_eq!(steps[0].1, 1);
        assert_eq!(steps[0].2, vec!["srv-101".to_string()]);
        assert_eq!(steps[1].0, Applied::Unshadowed { id: "srv-b".into() });
        assert_eq!(steps[1].1, 2);
    }

    #[tokio::test]
    async fn persist_failure_stops_drain() {
        let remote = FakeRemote::default();
        let mut state = LocalState::default();
        state.enqueue(MutationKind::Update, record("srv-a", "A"));
        state.enqueue(MutationKind::Update, record("srv-b", "B"));
        let state = Mutex::new(state);

        let err = Replayer::new(&remote)
            .drain(&state, |_| Err(Error::Storage("disk full".into())))
            .await
            .unwrap_err();

        assert_eq!(err, Error::Storage("disk full".into()));
        assert_eq!(state.lock().pending.len(), 1);
    }

    #[test]
    fn apply_promotion_for_deleted_record() {
        let mut state = LocalState::default();
        let mine = record("loc-1", "Mine");
        state.enqueue(MutationKind::Delete, mine.clone());

        let applied = Replayer::<FakeRemote>::apply(
            &mut state,
            &PendingMutation::create(mine),
            Ack::Created("srv-200".into()),
        );

        assert!(matches!(applied, Applied::Promoted { .. }));
        assert_eq!(state.pending[0].record.id, "srv-200");
        assert!(state.shadow_entry("srv-200").is_some());
    }
}
