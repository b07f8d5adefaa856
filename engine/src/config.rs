//! Configuration for the sync engine.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default remote collection endpoint.
pub const DEFAULT_REMOTE_URL: &str = "https://jsonplaceholder.typicode.com/posts";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote collection endpoint
    pub remote_url: String,
    /// Page size requested on every pull
    pub fetch_limit: u32,
    /// Transport timeout for each remote request
    pub request_timeout: Duration,
    /// Period of the auto-sync timer
    pub auto_sync_interval: Duration,
    /// Directory used by [`FileBackend`](crate::FileBackend)
    pub data_dir: PathBuf,
}

impl SyncConfig {
    /// Create a configuration for `remote_url` with default tuning.
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            fetch_limit: 10,
            request_timeout: Duration::from_secs(10),
            auto_sync_interval: Duration::from_secs(30),
            data_dir: PathBuf::from(".quotesync"),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let remote_url =
            env::var("QUOTESYNC_REMOTE_URL").unwrap_or_else(|_| DEFAULT_REMOTE_URL.to_string());
        let mut config = Self::new(remote_url);

        if let Ok(limit) = env::var("QUOTESYNC_FETCH_LIMIT") {
            config.fetch_limit = limit.parse().map_err(|_| ConfigError::InvalidFetchLimit)?;
        }

        if let Ok(secs) = env::var("QUOTESYNC_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| ConfigError::InvalidTimeout)?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(secs) = env::var("QUOTESYNC_AUTO_SYNC_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ConfigError::InvalidAutoSyncInterval)?;
            if secs == 0 {
                return Err(ConfigError::InvalidAutoSyncInterval);
            }
            config.auto_sync_interval = Duration::from_secs(secs);
        }

        if let Ok(dir) = env::var("QUOTESYNC_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Sets the page size for pulls.
    pub fn with_fetch_limit(mut self, limit: u32) -> Self {
        self.fetch_limit = limit;
        self
    }

    /// Sets the transport timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the auto-sync period.
    pub fn with_auto_sync_interval(mut self, interval: Duration) -> Self {
        self.auto_sync_interval = interval;
        self
    }

    /// Sets the storage directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REMOTE_URL)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid QUOTESYNC_FETCH_LIMIT value")]
    InvalidFetchLimit,

    #[error("Invalid QUOTESYNC_TIMEOUT_SECS value")]
    InvalidTimeout,

    #[error("Invalid QUOTESYNC_AUTO_SYNC_SECS value")]
    InvalidAutoSyncInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.remote_url, DEFAULT_REMOTE_URL);
        assert_eq!(config.fetch_limit, 10);
        assert_eq!(config.auto_sync_interval, Duration::from_secs(30));
    }

    #[test]
    fn builder() {
        let config = SyncConfig::new("http://localhost:3000/posts")
            .with_fetch_limit(5)
            .with_request_timeout(Duration::from_secs(2))
            .with_auto_sync_interval(Duration::from_millis(100))
            .with_data_dir("/tmp/quotes");

        assert_eq!(config.fetch_limit, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.auto_sync_interval, Duration::from_millis(100));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/quotes"));
    }
}
