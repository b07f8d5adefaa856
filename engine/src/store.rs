//! Local Store - key-value persistence of the four collections.
//!
//! A [`StoreBackend`] moves opaque strings under string keys. [`LocalStore`]
//! layers the collection schema on top: it owns the key names and the JSON
//! encoding, and recovers from corrupt data by falling back to empty
//! defaults instead of failing.

use crate::{error::Result, Error, LocalState, PendingMutation, Record, Timestamp};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key holding the record collection.
pub const RECORDS_KEY: &str = "quotes";
/// Key holding the pending mutation queue.
pub const PENDING_KEY: &str = "pendingQueue";
/// Key holding the remote shadow.
pub const SHADOW_KEY: &str = "serverShadow";
/// Key holding the last successful sync timestamp.
pub const LAST_SYNC_KEY: &str = "lastSync";

/// Raw string storage.
pub trait StoreBackend: Send + Sync {
    /// Read the value under `key`, `None` if never written.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Write several keys. Backends that can commit them together should.
    fn write_all(&self, entries: &[(&str, String)]) -> Result<()> {
        for (key, value) in entries {
            self.write(key, value)?;
        }
        Ok(())
    }
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing the schema.
    pub fn with_entry(self, key: &str, value: impl Into<String>) -> Self {
        self.entries.lock().insert(key.to_string(), value.into());
        self
    }

    /// Raw value under a key.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

impl StoreBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn write_all(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut map = self.entries.lock();
        for (key, value) in entries {
            map.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}

/// Backend storing one JSON file per key in a directory.
///
/// Each write goes to a temporary file that is renamed over the target.
/// [`write_all`](StoreBackend::write_all) stages every key before renaming
/// any, so a failed write leaves all targets untouched. A crash between
/// renames can still leave keys from two different saves.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Use `dir` for storage. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn staging_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{key}.json.tmp"))
    }
}

impl StoreBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::StateCorruption {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::Storage(e.to_string()))?;

        let target = self.path_for(key);
        let tmp = self.staging_path_for(key);
        fs::write(&tmp, value).map_err(|e| Error::Storage(e.to_string()))?;
        fs::rename(&tmp, &target).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    fn write_all(&self, entries: &[(&str, String)]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::Storage(e.to_string()))?;

        let mut staged = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let tmp = self.staging_path_for(key);
            if let Err(e) = fs::write(&tmp, value) {
                for (tmp, _) in &staged {
                    let _ = fs::remove_file(tmp);
                }
                return Err(Error::Storage(e.to_string()));
            }
            staged.push((tmp, self.path_for(key)));
        }

        for (tmp, target) in &staged {
            fs::rename(tmp, target).map_err(|e| Error::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

/// Typed access to the four collections.
#[derive(Debug)]
pub struct LocalStore<B> {
    backend: B,
}

impl<B: StoreBackend> LocalStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Access the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load all four collections.
    pub fn load(&self) -> LocalState {
        LocalState {
            records: self.records(),
            pending: self.pending(),
            shadow: self.shadow(),
            last_sync: self.last_sync(),
        }
    }

    /// Persist all four collections in one backend call.
    pub fn save(&self, state: &LocalState) -> Result<()> {
        self.backend.write_all(&[
            (RECORDS_KEY, encode(&state.records)?),
            (PENDING_KEY, encode(&state.pending)?),
            (SHADOW_KEY, encode(&state.shadow)?),
            (LAST_SYNC_KEY, encode(&state.last_sync)?),
        ])
    }

    pub fn records(&self) -> Vec<Record> {
        self.load_list(RECORDS_KEY)
    }

    pub fn set_records(&self, records: &[Record]) -> Result<()> {
        self.backend.write(RECORDS_KEY, &encode(&records)?)
    }

    pub fn pending(&self) -> VecDeque<PendingMutation> {
        self.load_list::<PendingMutation>(PENDING_KEY).into()
    }

    pub fn set_pending(&self, pending: &VecDeque<PendingMutation>) -> Result<()> {
        self.backend.write(PENDING_KEY, &encode(pending)?)
    }

    pub fn shadow(&self) -> Vec<Record> {
        self.load_list(SHADOW_KEY)
    }

    pub fn set_shadow(&self, shadow: &[Record]) -> Result<()> {
        self.backend.write(SHADOW_KEY, &encode(&shadow)?)
    }

    pub fn last_sync(&self) -> Option<Timestamp> {
        let raw = self.read_raw(LAST_SYNC_KEY)?;
        match serde_json::from_str::<Option<Timestamp>>(&raw) {
            Ok(value) => value,
            Err(e) => {
                report_corruption(LAST_SYNC_KEY, &e.to_string());
                None
            }
        }
    }

    pub fn set_last_sync(&self, timestamp: Option<Timestamp>) -> Result<()> {
        self.backend.write(LAST_SYNC_KEY, &encode(&timestamp)?)
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.backend.read(key) {
            Ok(raw) => raw,
            Err(e) => {
                report_corruption(key, &e.to_string());
                None
            }
        }
    }

    /// Decode a JSON array, dropping elements that do not match the schema.
    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.read_raw(key) else {
            return Vec::new();
        };

        let items = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                report_corruption(key, &e.to_string());
                return Vec::new();
            }
        };

        items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, index, error = %e, "dropping malformed entry");
                    None
                }
            })
            .collect()
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Storage(e.to_string()))
}

fn report_corruption(key: &str, reason: &str) {
    let err = Error::StateCorruption {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    warn!(error = %err, "resetting collection to its default");
}
