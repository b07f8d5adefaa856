//! Configuration management for the remote stand-in.

use std::env;

/// Number of posts served when `SEED_COUNT` is unset.
pub const DEFAULT_SEED_COUNT: u64 = 100;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Number of seeded posts in the collection
    pub seed_count: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let seed_count = match env::var("SEED_COUNT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidSeedCount)?,
            Err(_) => DEFAULT_SEED_COUNT,
        };

        Ok(Self {
            host,
            port,
            seed_count,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            seed_count: DEFAULT_SEED_COUNT,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid SEED_COUNT value")]
    InvalidSeedCount,
}
