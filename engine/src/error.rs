//! Error types for the quotesync engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the quotesync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Remote errors
    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    // Local state errors
    #[error("state corruption in '{key}': {reason}")]
    StateCorruption { key: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    // Input errors
    #[error("validation error: {0}")]
    Validation(String),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("no conflict recorded for: {0}")]
    ConflictNotFound(RecordId),

    #[error("a sync cycle is already in progress")]
    SyncInProgress,
}

impl Error {
    /// Whether this error aborts a sync cycle (as opposed to a local input problem).
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Parse(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Parse(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::RecordNotFound("loc-1".into());
        assert_eq!(err.to_string(), "record not found: loc-1");

        let err = Error::StateCorruption {
            key: "quotes".into(),
            reason: "expected value at line 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "state corruption in 'quotes': expected value at line 1"
        );

        let err = Error::Transport("connection refused".into());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn remote_errors() {
        assert!(Error::Transport("timeout".into()).is_remote());
        assert!(Error::Parse("bad json".into()).is_remote());
        assert!(!Error::Validation("empty text".into()).is_remote());
        assert!(!Error::SyncInProgress.is_remote());
    }
}
