//! # QuoteSync Engine
//!
//! A local-first sync engine for a small collection of quotes.
//!
//! The user edits quotes while offline; every edit lands in local storage
//! immediately and is queued. A sync cycle pulls the remote collection,
//! reconciles it against local state and then replays the queue against
//! the remote, promoting locally minted ids to the ids the remote assigns.
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is a quote with:
//! - Stable ID (`loc-` prefix until the remote accepts it, `srv-` after)
//! - Text, author and category
//! - Version number bumped on every local edit
//! - Origin and a transient conflict flag
//!
//! ### Pending Queue
//!
//! Local changes are expressed as [`PendingMutation`]s and replayed FIFO by
//! the [`Replayer`]. A failed push leaves the queue exactly as it was.
//!
//! ### Shadow
//!
//! The shadow is the engine's memory of what the remote looked like after
//! the last successful sync. The [`Reconciler`] compares the freshly pulled
//! page with the shadow to tell a server-side change from a stale local one.
//! The server wins; records the user was editing at the same time are
//! flagged as [`Conflict`]s for manual override.
//!
//! ## Quick Start
//!
//! ```rust
//! use quotesync_engine::{MemoryBackend, QuoteDraft, SyncConfig, SyncEngine};
//! # use async_trait::async_trait;
//! # use quotesync_engine::{Record, RecordId, RemoteClient};
//! # struct Offline;
//! # #[async_trait]
//! # impl RemoteClient for Offline {
//! #     async fn fetch_remote(&self) -> quotesync_engine::error::Result<Vec<Record>> { Ok(vec![]) }
//! #     async fn create_remote(&self, _: &Record) -> quotesync_engine::error::Result<RecordId> { Ok("srv-1".into()) }
//! #     async fn push_update(&self, _: &Record) -> quotesync_engine::error::Result<()> { Ok(()) }
//! # }
//!
//! let engine = SyncEngine::new(SyncConfig::default(), Offline, MemoryBackend::new());
//!
//! let quote = QuoteDraft::new("Stay hungry", "Jobs", "Life").validate().unwrap();
//! let record = engine.upsert_local(quote).unwrap();
//!
//! assert!(record.is_local_id());
//! assert_eq!(engine.pending().len(), 1);
//! ```
//!
//! ## Persistence
//!
//! State lives in four keyed collections behind a [`StoreBackend`]:
//! [`FileBackend`] for real use, [`MemoryBackend`] for tests. Use
//! [`SyncEngine::export_state`] and [`SyncEngine::import_state`] with
//! [`StateSnapshot`] for backup and restore.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod operation;
pub mod reconcile;
pub mod record;
pub mod remote;
pub mod replay;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod sync;
pub mod validate;

// Re-export main types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, SyncConfig};
pub use engine::{Resolution, SyncEngine};
pub use error::Error;
pub use operation::{MutationKind, PendingMutation};
pub use reconcile::{Change, ChangeKind, Conflict, ReconcileResult, Reconciler};
pub use record::{Origin, Record};
pub use remote::{CreatedPost, HttpRemote, NewPost, RemoteClient, RemotePost};
pub use replay::{Ack, Applied, DrainReport, Replayer};
pub use snapshot::{StateSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use state::LocalState;
pub use store::{FileBackend, LocalStore, MemoryBackend, StoreBackend};
pub use sync::{NoopObserver, SyncMode, SyncObserver, SyncOutcome, SyncPhase, SyncReport};
pub use validate::{Quote, QuoteDraft};

/// Type aliases for clarity
pub type RecordId = String;
pub type Version = u64;
pub type Timestamp = u64;
