//! Error types for the fetcher module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during media acquisition.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Extraction tool binary not found.
    #[error("extraction tool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// The tool exited with a failure (network error, resource unavailable,
    /// access denied). Fatal for the job; the tool performs its own retries.
    #[error("extraction failed: {reason}")]
    ExtractionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Metadata output could not be parsed.
    #[error("failed to parse tool metadata: {reason}")]
    MetadataParse { reason: String },

    /// The tool reported success but the expected output file is missing.
    #[error("media file not found after download: {path}")]
    OutputMissing { path: PathBuf },

    /// The acquisition exceeded the configured deadline.
    #[error("acquisition timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while driving the tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Creates an extraction failure with captured stderr output.
    pub fn extraction_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ExtractionFailed {
            reason: reason.into(),
            stderr,
        }
    }
}
