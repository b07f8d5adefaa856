//! The engine instance and its UI-facing operations.
//!
//! [`SyncEngine`] owns the working copy of the four collections, the
//! injected store backend, remote client, clock and observer. Every local
//! operation mutates a copy of the state, persists it, and only then makes
//! it visible, so a failed write leaves the previous state in place.

use crate::{
    error::Result, Clock, Conflict, Error, FileBackend, HttpRemote, LocalState, LocalStore,
    MutationKind, Quote, Record, RemoteClient, StateSnapshot, StoreBackend, SyncConfig,
    SyncObserver, SyncPhase, SystemClock, Timestamp,
};
use crate::sync::{AutoSync, InFlight, NoopObserver};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Manual choice for a flagged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// Keep the value the server reported
    KeepRemote,
    /// Restore the user's value and queue it for push
    KeepLocal,
}

/// Local-first sync engine.
pub struct SyncEngine<R, B> {
    pub(crate) config: SyncConfig,
    pub(crate) remote: R,
    pub(crate) store: LocalStore<B>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) observer: Arc<dyn SyncObserver>,
    pub(crate) state: Mutex<LocalState>,
    pub(crate) conflicts: Mutex<Vec<Conflict>>,
    pub(crate) phase: Mutex<SyncPhase>,
    pub(crate) in_flight: AtomicBool,
    pub(crate) auto_sync: Mutex<Option<AutoSync>>,
}

impl SyncEngine<HttpRemote, FileBackend> {
    /// Build an engine talking HTTP and persisting under `config.data_dir`.
    pub fn from_config(config: SyncConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let remote = HttpRemote::new(&config, clock.clone())?;
        let backend = FileBackend::new(config.data_dir.clone());
        Ok(Self::new(config, remote, backend).with_clock(clock))
    }
}

impl<R: RemoteClient, B: StoreBackend> SyncEngine<R, B> {
    /// Create an engine, loading whatever state the backend holds.
    pub fn new(config: SyncConfig, remote: R, backend: B) -> Self {
        let store = LocalStore::new(backend);
        let state = store.load();
        let conflicts = state.flagged_conflicts();
        debug!(
            records = state.records.len(),
            pending = state.pending.len(),
            shadow = state.shadow.len(),
            conflicts = conflicts.len(),
            "loaded local state"
        );

        Self {
            config,
            remote,
            store,
            clock: Arc::new(SystemClock),
            observer: Arc::new(NoopObserver),
            state: Mutex::new(state),
            conflicts: Mutex::new(conflicts),
            phase: Mutex::new(SyncPhase::Idle),
            in_flight: AtomicBool::new(false),
            auto_sync: Mutex::new(None),
        }
    }

    /// Use a different time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receive render and notify callbacks.
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn store(&self) -> &LocalStore<B> {
        &self.store
    }

    /// Current records.
    pub fn records(&self) -> Vec<Record> {
        self.state.lock().records.clone()
    }

    /// Get a record by ID.
    pub fn record(&self, id: &str) -> Option<Record> {
        self.state.lock().record(id).cloned()
    }

    /// Queued mutations, oldest first.
    pub fn pending(&self) -> Vec<crate::PendingMutation> {
        self.state.lock().pending.iter().cloned().collect()
    }

    /// Remote shadow.
    pub fn shadow(&self) -> Vec<Record> {
        self.state.lock().shadow.clone()
    }

    /// Completion time of the last successful sync.
    pub fn last_sync(&self) -> Option<Timestamp> {
        self.state.lock().last_sync
    }

    /// Conflicts awaiting manual resolution.
    pub fn conflicts(&self) -> Vec<Conflict> {
        self.conflicts.lock().clone()
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.lock()
    }

    /// Whether a sync cycle is running.
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Create a quote, or edit the one named by `quote.id()`.
    pub fn upsert_local(&self, quote: Quote) -> Result<Record> {
        let now = self.clock.now();

        let record = self.commit(|state| match quote.id() {
            Some(id) => {
                let record = state
                    .record_mut(id)
                    .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
                record.edit(quote.text(), quote.author(), quote.category(), now);
                let record = record.clone();
                state.enqueue(MutationKind::Update, record.clone());
                Ok(record)
            }
            None => {
                let record =
                    Record::new_local(quote.text(), quote.author(), quote.category(), now);
                state.upsert_record(record.clone());
                state.enqueue(MutationKind::Create, record.clone());
                Ok(record)
            }
        })?;

        self.forget_conflict(&record.id);
        debug!(id = %record.id, version = record.version, "local upsert");
        self.render();
        Ok(record)
    }

    /// Delete a quote and queue the deletion.
    pub fn delete_local(&self, id: &str) -> Result<Record> {
        let removed = self.commit(|state| {
            let record = state
                .remove_record(id)
                .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
            state.enqueue(MutationKind::Delete, record.clone());
            Ok(record)
        })?;

        self.forget_conflict(id);
        debug!(id, "local delete");
        self.render();
        Ok(removed)
    }

    /// Settle a flagged record.
    pub fn resolve_conflict(&self, id: &str, resolution: Resolution) -> Result<Record> {
        let conflict = self
            .conflicts
            .lock()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::ConflictNotFound(id.to_string()))?;
        let now = self.clock.now();

        let record = self.commit(|state| {
            let record = match resolution {
                Resolution::KeepRemote => {
                    let mut record = conflict.remote.clone();
                    record.conflicted = false;
                    record
                }
                Resolution::KeepLocal => {
                    let mut record = conflict.local.clone();
                    record.touch(now);
                    state.enqueue(MutationKind::Update, record.clone());
                    record
                }
            };
            state.upsert_record(record.clone());
            Ok(record)
        })?;

        self.forget_conflict(id);
        info!(id, ?resolution, "conflict resolved");
        self.render();
        Ok(record)
    }

    /// Capture all four collections.
    pub fn export_state(&self) -> StateSnapshot {
        StateSnapshot::capture(&self.state.lock(), self.clock.now())
    }

    /// Replace local state with a snapshot.
    ///
    /// Holds the in-flight flag while it runs, so no cycle can start until
    /// the new state is committed.
    pub fn import_state(&self, snapshot: StateSnapshot) -> Result<()> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            return Err(Error::SyncInProgress);
        };
        snapshot.validate()?;

        let imported = snapshot.into_state();
        let conflicts = imported.flagged_conflicts();
        self.commit(|state| {
            *state = imported;
            Ok(())
        })?;

        *self.conflicts.lock() = conflicts;
        info!(records = self.state.lock().records.len(), "state imported");
        self.render();
        Ok(())
    }

    /// Apply `change` to a copy of the state, persist it, then publish it.
    pub(crate) fn commit<T>(&self, change: impl FnOnce(&mut LocalState) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock();
        let mut next = state.clone();
        let value = change(&mut next)?;
        self.store.save(&next)?;
        *state = next;
        Ok(value)
    }

    pub(crate) fn render(&self) {
        let records = self.records();
        self.observer.render(&records);
    }

    pub(crate) fn remember_conflicts(&self, detected: &[Conflict]) {
        let mut conflicts = self.conflicts.lock();
        for conflict in detected {
            conflicts.retain(|c| c.id != conflict.id);
            conflicts.push(conflict.clone());
        }
    }

    fn forget_conflict(&self, id: &str) {
        self.conflicts.lock().retain(|c| c.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryBackend, QuoteDraft, RecordId};
    use async_trait::async_trait;

    struct OfflineRemote;

    #[async_trait]
    impl RemoteClient for OfflineRemote {
        async fn fetch_remote(&self) -> Result<Vec<Record>> {
            Err(Error::Transport("offline".into()))
        }

        async fn create_remote(&self, _record: &Record) -> Result<RecordId> {
            Err(Error::Transport("offline".into()))
        }

        async fn push_update(&self, _record: &Record) -> Result<()> {
            Err(Error::Transport("offline".into()))
        }
    }

    /// Backend whose writes always fail.
    struct ReadOnlyBackend;

    impl StoreBackend for ReadOnlyBackend {
        fn read(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn write(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("read-only".into()))
        }
    }

    fn engine() -> SyncEngine<OfflineRemote, MemoryBackend> {
        SyncEngine::new(SyncConfig::default(), OfflineRemote, MemoryBackend::new())
            .with_clock(Arc::new(crate::ManualClock::new(1000)))
    }

    fn quote(text: &str) -> Quote {
        QuoteDraft::new(text, "Author", "Life").validate().unwrap()
    }

    #[test]
    fn create_queues_and_persists() {
        let engine = engine();
        let record = engine.upsert_local(quote("First")).unwrap();

        assert!(record.is_local_id());
        assert_eq!(record.updated_at, 1000);
        assert_eq!(engine.pending().len(), 1);
        assert_eq!(engine.pending()[0].operation, MutationKind::Create);
        assert_eq!(engine.store().load().records, engine.records());
    }

    #[test]
    fn edit_bumps_version_and_queues_update() {
        let engine = engine();
        let created = engine.upsert_local(quote("First")).unwrap();

        let draft = QuoteDraft::new("Second", "Author", "Life").with_id(created.id.clone());
        let edited = engine.upsert_local(draft.validate().unwrap()).unwrap();

        assert_eq!(edited.id, created.id);
        assert_eq!(edited.version, 2);
        assert_eq!(engine.records().len(), 1);
        assert_eq!(engine.pending()[1].operation, MutationKind::Update);
    }

    #[test]
    fn edit_unknown_id_fails() {
        let engine = engine();
        let draft = QuoteDraft::new("x", "y", "z").with_id("srv-404");

        let err = engine.upsert_local(draft.validate().unwrap()).unwrap_err();

        assert_eq!(err, Error::RecordNotFound("srv-404".into()));
        assert!(engine.pending().is_empty());
    }

    #[test]
    fn delete_queues_delete() {
        let engine = engine();
        let created = engine.upsert_local(quote("First")).unwrap();

        engine.delete_local(&created.id).unwrap();

        assert!(engine.records().is_empty());
        let ops: Vec<_> = engine.pending().iter().map(|m| m.operation).collect();
        assert_eq!(ops, vec![MutationKind::Create, MutationKind::Delete]);
        assert!(matches!(
            engine.delete_local(&created.id),
            Err(Error::RecordNotFound(_))
        ));
    }

    #[test]
    fn failed_write_leaves_state_untouched() {
        let engine = SyncEngine::new(SyncConfig::default(), OfflineRemote, ReadOnlyBackend);

        let err = engine.upsert_local(quote("First")).unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(engine.records().is_empty());
        assert!(engine.pending().is_empty());
    }

    #[test]
    fn resolve_unknown_conflict() {
        let engine = engine();
        assert_eq!(
            engine.resolve_conflict("srv-1", Resolution::KeepLocal),
            Err(Error::ConflictNotFound("srv-1".into()))
        );
    }

    #[test]
    fn export_import_roundtrip() {
        let source = engine();
        source.upsert_local(quote("First")).unwrap();
        source.upsert_local(quote("Second")).unwrap();
        let snapshot = source.export_state();

        let target = engine();
        target.import_state(snapshot.clone()).unwrap();

        assert_eq!(target.records(), source.records());
        assert_eq!(target.pending(), source.pending());
        assert_eq!(target.store().load().records.len(), 2);
    }

    #[test]
    fn import_refused_while_syncing() {
        let engine = engine();
        let snapshot = engine.export_state();
        engine.in_flight.store(true, Ordering::SeqCst);

        assert_eq!(engine.import_state(snapshot), Err(Error::SyncInProgress));
    }

    #[test]
    fn import_releases_the_sync_flag() {
        let engine = engine();
        let snapshot = engine.export_state();

        engine.import_state(snapshot.clone()).unwrap();
        assert!(!engine.is_syncing());

        let mut stale = snapshot;
        stale.format_version += 1;
        assert!(engine.import_state(stale).is_err());
        assert!(!engine.is_syncing());
    }

    /// Records whether the engine reported a cycle in flight while rendering.
    #[derive(Default)]
    struct FlagWatcher {
        engine: std::sync::OnceLock<std::sync::Weak<SyncEngine<OfflineRemote, MemoryBackend>>>,
        seen: Mutex<Vec<bool>>,
    }

    impl SyncObserver for FlagWatcher {
        fn render(&self, _records: &[Record]) {
            if let Some(engine) = self.engine.get().and_then(|weak| weak.upgrade()) {
                self.seen.lock().push(engine.is_syncing());
            }
        }
    }

    #[test]
    fn import_holds_the_sync_flag_until_done() {
        let watcher = Arc::new(FlagWatcher::default());
        let engine = Arc::new(engine().with_observer(watcher.clone()));
        let _ = watcher.engine.set(Arc::downgrade(&engine));

        engine.import_state(engine.export_state()).unwrap();

        assert_eq!(*watcher.seen.lock(), vec![true]);
        assert!(!engine.is_syncing());
    }
}
