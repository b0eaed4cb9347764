//! Error types for the feed module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the feed store.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The persisted document exists but cannot be parsed. Loading fails
    /// fast rather than silently starting from an empty feed.
    #[error("corrupt feed document at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Atomic persistence failed. The previously persisted state on disk is
    /// intact; the attempted mutation was rolled back.
    #[error("failed to persist feed: {0}")]
    Persist(#[source] std::io::Error),

    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
