//! Error types shared by every SubClaw crate.

use thiserror::Error;

/// Errors raised at collaborator boundaries.
///
/// Components catch these at their own boundary and turn them into a log line,
/// a user-facing reply, or a sentinel return. Nothing here is meant to reach
/// the top of the process once startup is done.
#[derive(Debug, Error)]
pub enum SubClawError {
    /// Reading the backing spreadsheet failed. The cache keeps its last snapshot.
    #[error("Store read failed: {0}")]
    StoreRead(String),

    /// Writing a cell to the backing spreadsheet failed.
    #[error("Store write failed: {0}")]
    StoreWrite(String),

    /// A single outbound chat message could not be delivered.
    #[error("Send to {to} failed: {reason}")]
    Send { to: String, reason: String },

    /// Lookup miss (client id, search query). Not an operational error.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Obtaining or refreshing an API access token failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SubClawError {
    /// Build a `Send` error for a recipient.
    pub fn send(to: &str, reason: impl std::fmt::Display) -> Self {
        Self::Send {
            to: to.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Lookup misses are reported to the requester but never logged as errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SubClawError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SubClawError>;
