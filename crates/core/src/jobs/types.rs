//! Core job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::fetcher::FetchProgress;
use crate::resolver::ResolveError;

/// The caller-supplied pointer to media.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceReference {
    /// A remote locator string (watch link, short link, ...).
    RemoteLocator { url: String },
    /// Already-received bytes on local disk.
    UploadedBytes {
        path: PathBuf,
        original_name: String,
    },
}

impl SourceReference {
    /// Short kind label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceReference::RemoteLocator { .. } => "remote",
            SourceReference::UploadedBytes { .. } => "upload",
        }
    }
}

/// Stable failure category surfaced alongside the human-readable message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Extraction tool failure (network, unavailable, access denied).
    AcquisitionFailed,
    /// Encoder failure with no usable fallback.
    TranscodeFailed,
    /// Atomic feed save failed; prior persisted state is intact.
    FeedPersist,
    /// Anything else (filesystem, unexpected state).
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::AcquisitionFailed => "acquisition_failed",
            ErrorCategory::TranscodeFailed => "transcode_failed",
            ErrorCategory::FeedPersist => "feed_persist",
            ErrorCategory::Internal => "internal",
        }
    }
}

/// Per-job state machine.
///
/// Linear progression with a terminal-failure exit at every step:
/// `Pending -> Acquiring -> Transcoding -> Publishing -> Completed`,
/// any step may instead reach `Failed`; `Cancelled` is a failure variant
/// requested by the caller. Terminal states never transition again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobState {
    /// Created, waiting for a worker.
    Pending,

    /// Raw media is being acquired.
    Acquiring {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<FetchProgress>,
    },

    /// Raw media is being converted to the canonical format.
    Transcoding,

    /// The entry is being added to the feed store.
    Publishing,

    /// The pipeline finished. `duplicate` distinguishes "already existed"
    /// from "freshly published"; both carry the entry id.
    Completed {
        entry_id: String,
        duplicate: bool,
        /// Non-fatal warning (e.g. the transcode fallback fired).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },

    /// The pipeline failed.
    Failed {
        category: ErrorCategory,
        message: String,
    },

    /// Cancelled by the caller before completion.
    Cancelled,
}

impl JobState {
    /// Snake_case name of the state variant.
    pub fn state_type(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Acquiring { .. } => "acquiring",
            JobState::Transcoding => "transcoding",
            JobState::Publishing => "publishing",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    /// Whether the state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed { .. } | JobState::Failed { .. } | JobState::Cancelled
        )
    }

    /// Human-readable one-liner for status polling.
    pub fn message(&self) -> String {
        match self {
            JobState::Pending => "Queued".to_string(),
            JobState::Acquiring { progress: None } => "Starting download...".to_string(),
            JobState::Acquiring {
                progress: Some(progress),
            } => {
                let rate = progress.rate.as_deref().unwrap_or("N/A");
                let eta = progress.eta.as_deref().unwrap_or("N/A");
                format!(
                    "Downloading: {:.1}% ({}, ETA: {})",
                    progress.percent, rate, eta
                )
            }
            JobState::Transcoding => "Converting to audio...".to_string(),
            JobState::Publishing => "Updating feed...".to_string(),
            JobState::Completed {
                duplicate: true, ..
            } => "Already in feed".to_string(),
            JobState::Completed {
                warning: Some(warning),
                ..
            } => format!("Published ({})", warning),
            JobState::Completed { .. } => "Published".to_string(),
            JobState::Failed { message, .. } => message.clone(),
            JobState::Cancelled => "Cancelled".to_string(),
        }
    }
}

/// A submitted job. Owned exclusively by the orchestrator that created it;
/// callers only observe snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub source: SourceReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_override: Option<String>,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(source: SourceReference, title: Option<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            source,
            title_override: title,
            description_override: description,
            state: JobState::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A job submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub source: SourceReference,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Errors returned synchronously at submission time.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The locator was rejected by the resolver; no job was created.
    #[error(transparent)]
    InvalidSource(#[from] ResolveError),

    /// The job queue is full.
    #[error("job queue is full (capacity {capacity})")]
    Busy { capacity: usize },

    /// The orchestrator is not running.
    #[error("orchestrator is not running")]
    NotRunning,
}

/// Errors returned by cancellation.
#[derive(Debug, Error)]
pub enum CancelError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job already in terminal state: {0}")]
    AlreadyTerminal(String),
}

/// Current orchestrator status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub running: bool,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Jobs currently tracked by the registry (any state).
    pub jobs: usize,
}
