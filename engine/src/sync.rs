//! Sync Orchestrator - the pull → reconcile → drain → advance-clock cycle.
//!
//! # Lifecycle
//!
//! ```text
//! Idle → Syncing → Idle
//!           ↓
//!         Failed → Idle
//! ```
//!
//! A trigger that arrives while a cycle is in flight is dropped, not queued.
//! There is no automatic retry: the next manual or timer trigger is the
//! retry.

use crate::{
    error::Result, Change, Conflict, DrainReport, Reconciler, Record, RemoteClient, Replayer,
    StoreBackend, SyncEngine, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How much a cycle tells the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncMode {
    /// Manual trigger: a notification per classified change
    Verbose,
    /// Timer trigger: only conflicts and failures are announced
    Silent,
}

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    Idle,
    Syncing,
    Failed,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPhase::Idle => write!(f, "idle"),
            SyncPhase::Syncing => write!(f, "syncing"),
            SyncPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Callbacks into the UI.
pub trait SyncObserver: Send + Sync {
    /// Called with the current records after every state-mutating step.
    fn render(&self, _records: &[Record]) {}

    /// Called with a short human-readable message.
    fn notify(&self, _message: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Summary of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Changes applied by reconciliation
    pub changes: Vec<Change>,
    /// Conflicts detected in this cycle
    pub conflicts: Vec<Conflict>,
    /// What the queue drain did
    pub drain: DrainReport,
    /// New value of the sync clock
    pub completed_at: Timestamp,
    pub duration: Duration,
}

/// Result of a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another cycle was in flight; this trigger was dropped
    AlreadyRunning,
}

impl SyncOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            SyncOutcome::AlreadyRunning => None,
        }
    }
}

/// Holds the in-flight flag for the duration of a cycle.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to the running auto-sync timer.
pub(crate) struct AutoSync {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl AutoSync {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    fn stop(self) {
        // The task exits at its next wait; a cycle in progress completes.
        let _ = self.stop.send(true);
    }
}

impl<R: RemoteClient, B: StoreBackend> SyncEngine<R, B> {
    /// Run one sync cycle unless one is already in flight.
    pub async fn trigger_sync(&self, mode: SyncMode) -> Result<SyncOutcome> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            debug!(?mode, "sync already in flight, dropping trigger");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        self.set_phase(SyncPhase::Syncing);
        let started = Instant::now();

        match self.run_cycle(mode, started).await {
            Ok(report) => {
                info!(
                    changes = report.changes.len(),
                    conflicts = report.conflicts.len(),
                    drained = report.drain.drained(),
                    duration_ms = report.duration.as_millis() as u64,
                    "sync complete"
                );
                self.set_phase(SyncPhase::Idle);
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                error!(error = %e, ?mode, "sync failed");
                self.set_phase(SyncPhase::Failed);
                self.observer.notify(&format!("Sync failed: {e}"));
                self.set_phase(SyncPhase::Idle);
                Err(e)
            }
        }
    }

    async fn run_cycle(&self, mode: SyncMode, started: Instant) -> Result<SyncReport> {
        let remote = self.remote.fetch_remote().await?;
        debug!(count = remote.len(), "pulled remote page");

        let reconciler = Reconciler::new(self.clock.now());
        let result = self.commit(|state| {
            let result = reconciler.reconcile(&remote, state);
            for record in &remote {
                state.upsert_shadow(record.clone());
            }
            Ok(result)
        })?;

        self.remember_conflicts(&result.conflicts);
        self.render();
        self.announce(mode, &result.changes);

        let drain = Replayer::new(&self.remote)
            .drain_with(&self.state, |state| self.store.save(state), |_| self.render())
            .await?;

        let completed_at = self.clock.now();
        self.commit(|state| {
            state.last_sync = Some(completed_at);
            Ok(())
        })?;

        if mode == SyncMode::Verbose {
            self.observer.notify(&format!(
                "Sync complete: {} change(s), {} conflict(s), {} mutation(s) pushed",
                result.changes.len(),
                result.conflicts.len(),
                drain.drained()
            ));
        }

        Ok(SyncReport {
            changes: result.changes,
            conflicts: result.conflicts,
            drain,
            completed_at,
            duration: started.elapsed(),
        })
    }

    fn announce(&self, mode: SyncMode, changes: &[Change]) {
        for change in changes {
            if mode == SyncMode::Verbose || change.kind.is_conflict() {
                self.observer.notify(&change.to_string());
            }
        }
    }

    fn set_phase(&self, phase: SyncPhase) {
        let mut current = self.phase.lock();
        debug!(from = %*current, to = %phase, "sync phase");
        *current = phase;
    }

    /// Whether the auto-sync timer is running.
    pub fn auto_sync_enabled(&self) -> bool {
        self.auto_sync
            .lock()
            .as_ref()
            .is_some_and(AutoSync::is_running)
    }
}

impl<R, B> SyncEngine<R, B>
where
    R: RemoteClient + 'static,
    B: StoreBackend + 'static,
{
    /// Start or stop silent syncing every `config.auto_sync_interval`.
    ///
    /// Must be called inside a tokio runtime when enabling.
    pub fn set_auto_sync(self: &Arc<Self>, enabled: bool) {
        let mut slot = self.auto_sync.lock();

        if !enabled {
            if let Some(auto_sync) = slot.take() {
                auto_sync.stop();
                info!("auto-sync stopped");
            }
            return;
        }

        if slot.as_ref().is_some_and(AutoSync::is_running) {
            return;
        }

        let period = self.config.auto_sync_interval;
        if period.is_zero() {
            warn!("auto-sync interval is zero, not starting timer");
            return;
        }
        let engine = Arc::downgrade(self);
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {}
                }

                let Some(engine) = engine.upgrade() else {
                    break;
                };
                if let Err(e) = engine.trigger_sync(SyncMode::Silent).await {
                    warn!(error = %e, "auto-sync cycle failed");
                }
            }
            debug!("auto-sync task exited");
        });

        info!(period_ms = period.as_millis() as u64, "auto-sync started");
        *slot = Some(AutoSync { stop, handle });
    }
}
