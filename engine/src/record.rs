//! Record types for storing quotes.

use crate::{RecordId, Timestamp, Version};
use serde::{Deserialize, Serialize};

/// Prefix for ids minted on this device before the remote has seen them.
pub const LOCAL_ID_PREFIX: &str = "loc-";

/// Prefix for ids assigned by the remote collection.
pub const REMOTE_ID_PREFIX: &str = "srv-";

/// Category given to every record discovered on the remote side.
pub const REMOTE_CATEGORY: &str = "Server";

/// Origin of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Created locally and not yet promoted
    Local,
    /// Known to the remote collection
    Remote,
}

/// A quote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier (`loc-` or `srv-` prefixed)
    pub id: RecordId,
    /// Quote text
    pub text: String,
    /// Who said it
    pub author: String,
    /// Category label
    pub category: String,
    /// Last modification time (milliseconds since epoch)
    pub updated_at: Timestamp,
    /// Incremented on each local mutation
    pub version: Version,
    /// Where the record came from
    pub origin: Origin,
    /// Transient flag set when the reconciler detected a conflict
    #[serde(default)]
    pub conflicted: bool,
}

impl Record {
    /// Create a new locally originated record with a freshly minted id.
    pub fn new_local(
        text: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: mint_local_id(),
            text: text.into(),
            author: author.into(),
            category: category.into(),
            updated_at: timestamp,
            version: 1,
            origin: Origin::Local,
            conflicted: false,
        }
    }

    /// Create a record as observed on the remote side.
    pub fn new_remote(
        id: impl Into<RecordId>,
        text: impl Into<String>,
        author: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            author: author.into(),
            category: REMOTE_CATEGORY.to_string(),
            updated_at: timestamp,
            version: 1,
            origin: Origin::Remote,
            conflicted: false,
        }
    }

    /// Whether the id was minted locally and has not been promoted yet.
    pub fn is_local_id(&self) -> bool {
        is_local_id(&self.id)
    }

    /// Compare the user-visible content of two records.
    ///
    /// Timestamps, versions, origin and the conflict flag are ignored:
    /// remote timestamps are synthesized at fetch time and carry no signal.
    pub fn same_content(&self, other: &Record) -> bool {
        self.id == other.id
            && self.text == other.text
            && self.author == other.author
            && self.category == other.category
    }

    /// Apply a local edit.
    pub fn edit(
        &mut self,
        text: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
        timestamp: Timestamp,
    ) {
        self.text = text.into();
        self.author = author.into();
        self.category = category.into();
        self.touch(timestamp);
    }

    /// Bump version and timestamp after a local mutation.
    pub fn touch(&mut self, timestamp: Timestamp) {
        self.version += 1;
        self.updated_at = timestamp;
        self.conflicted = false;
    }

    /// Rewrite this record to a remote-assigned identity.
    pub fn promote(&mut self, remote_id: impl Into<RecordId>) {
        self.id = remote_id.into();
        self.origin = Origin::Remote;
    }
}

/// Mint a fresh local id.
pub fn mint_local_id() -> RecordId {
    format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4().simple())
}

/// Build the record id for a remote-native identifier.
pub fn remote_id(native_id: u64) -> RecordId {
    format!("{}{}", REMOTE_ID_PREFIX, native_id)
}

/// Whether an id belongs to the local namespace.
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}
