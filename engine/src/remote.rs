//! Remote Client - fetch and create against the remote collection.
//!
//! The remote speaks its own item shape ([`RemotePost`]). This module maps it
//! to [`Record`] on the way in and back to [`NewPost`] on the way out.
//!
//! The remote carries no modification time, so every fetched record is
//! stamped with the time of the fetch. Freshness is therefore approximate;
//! change detection must compare content, never timestamps.

use crate::{error::Result, record, Clock, Error, Record, RecordId, SyncConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Author id sent with creates.
pub const DEFAULT_USER_ID: u64 = 1;

/// An item as served by the remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePost {
    pub id: u64,
    pub title: String,
    pub user_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub user_id: u64,
}

impl NewPost {
    /// Build the wire body for a local record.
    pub fn from_record(record: &Record) -> Self {
        Self {
            title: record.text.clone(),
            body: record.author.clone(),
            user_id: DEFAULT_USER_ID,
        }
    }
}

/// Acknowledgement of a create. Only the id is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPost {
    pub id: u64,
}

/// Operations the engine needs from the remote side.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetch the current page of the remote collection as records.
    async fn fetch_remote(&self) -> Result<Vec<Record>>;

    /// Submit a record for creation and return the remote-assigned id.
    async fn create_remote(&self, record: &Record) -> Result<RecordId>;

    /// Push new content for an existing record. Only success is reported.
    async fn push_update(&self, record: &Record) -> Result<()>;
}

/// Map a remote item to a record observed at `fetched_at`.
pub fn map_post(post: &RemotePost, fetched_at: u64) -> Record {
    Record::new_remote(
        record::remote_id(post.id),
        capitalize(&post.title),
        format!("User {}", post.user_id),
        fetched_at,
    )
}

/// Upper-case the first character.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// HTTP client for a JSON collection endpoint.
pub struct HttpRemote {
    client: reqwest::Client,
    endpoint: String,
    limit: u32,
    clock: Arc<dyn Clock>,
}

impl HttpRemote {
    /// Create a client from the engine configuration.
    pub fn new(config: &SyncConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.remote_url.clone(),
            limit: config.fetch_limit,
            clock,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: &NewPost) -> Result<CreatedPost> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| Error::Parse(e.to_string()))
    }
}

#[async_trait]
impl RemoteClient for HttpRemote {
    async fn fetch_remote(&self) -> Result<Vec<Record>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("limit", self.limit)])
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        let posts: Vec<RemotePost> =
            serde_json::from_str(&text).map_err(|e| Error::Parse(e.to_string()))?;

        let fetched_at = self.clock.now();
        debug!(count = posts.len(), "fetched remote page");
        Ok(posts.iter().map(|p| map_post(p, fetched_at)).collect())
    }

    async fn create_remote(&self, record: &Record) -> Result<RecordId> {
        let created = self.post(&NewPost::from_record(record)).await?;
        Ok(record::remote_id(created.id))
    }

    async fn push_update(&self, record: &Record) -> Result<()> {
        // The collection has no update endpoint; content is re-posted and
        // the assigned id discarded.
        self.post(&NewPost::from_record(record)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::REMOTE_CATEGORY, Origin};

    #[test]
    fn capitalize_first_char() {
        assert_eq!(capitalize("hello"), "Hello");
        assert_eq!(capitalize("Hello"), "Hello");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("éclair"), "Éclair");
    }

    #[test]
    fn map_native_item() {
        let post = RemotePost {
            id: 9,
            title: "hello".into(),
            user_id: 3,
            body: Some("ignored".into()),
        };

        let record = map_post(&post, 5000);

        assert_eq!(record.id, "srv-9");
        assert_eq!(record.text, "Hello");
        assert_eq!(record.author, "User 3");
        assert_eq!(record.category, REMOTE_CATEGORY);
        assert_eq!(record.updated_at, 5000);
        assert_eq!(record.origin, Origin::Remote);
        assert!(!record.conflicted);
    }

    #[test]
    fn native_item_from_json() {
        let json = r#"[{"userId": 1, "id": 1, "title": "sunt aut", "body": "quia"}]"#;
        let posts: Vec<RemotePost> = serde_json::from_str(json).unwrap();
        assert_eq!(posts[0].id, 1);
        assert_eq!(posts[0].user_id, 1);
    }

    #[test]
    fn create_body_shape() {
        let record = Record::new_local("Stay hungry", "Jobs", "Motivation", 1);
        let body = serde_json::to_value(NewPost::from_record(&record)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({"title": "Stay hungry", "body": "Jobs", "userId": 1})
        );
    }

    #[test]
    fn http_remote_uses_config() {
        let config = SyncConfig::new("http://127.0.0.1:9/posts").with_fetch_limit(3);
        let remote = HttpRemote::new(&config, Arc::new(crate::SystemClock)).unwrap();
        assert_eq!(remote.endpoint(), "http://127.0.0.1:9/posts");
        assert_eq!(remote.limit, 3);
    }
}
