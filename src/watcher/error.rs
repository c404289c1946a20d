//! Error types for the settle watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher construction and from the running subscription.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Dead-time must be greater than zero")]
    InvalidDeadTime,

    #[error("Couldn't get absolute path of {path}: {reason}")]
    PathResolution { path: PathBuf, reason: String },

    #[error("Couldn't establish watcher: {reason}")]
    SubscriptionOpen { reason: String },

    #[error("Couldn't watch directory {path}: {reason}")]
    DirectoryRegistration { path: PathBuf, reason: String },

    /// Reported by the subscription after the watch is running. Never fatal.
    #[error("File system event error: {details}")]
    Runtime { details: String },

    #[error("Couldn't start watcher thread: {reason}")]
    Spawn { reason: String },
}

impl WatchError {
    /// True for failures to open the subscription or register the directory.
    pub fn is_subscription_error(&self) -> bool {
        matches!(
            self,
            WatchError::SubscriptionOpen { .. } | WatchError::DirectoryRegistration { .. }
        )
    }
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::SubscriptionOpen {
            reason: e.to_string(),
        }
    }
}
