//! The job registry: the orchestrator's only mutable job table.
//!
//! All job mutation goes through this type, keeping the mutation points
//! auditable. Each slot also carries the cancellation flag for its job.

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use tokio::sync::{watch, RwLock};
use tracing::debug;

use crate::fetcher::FetchProgress;

use super::types::{Job, JobState};

/// Outcome of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// No job with that id.
    NotFound,
    /// The job had already reached a terminal state.
    AlreadyTerminal,
    /// The cancellation flag was raised.
    Requested,
}

struct JobSlot {
    job: Job,
    cancel_tx: watch::Sender<bool>,
}

/// Registry of all jobs known to the orchestrator.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobSlot>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a freshly created job.
    pub async fn insert(&self, job: Job) {
        let (cancel_tx, _) = watch::channel(false);
        self.jobs
            .write()
            .await
            .insert(job.id.clone(), JobSlot { job, cancel_tx });
    }

    /// Removes a job outright (submission rollback).
    pub async fn remove(&self, id: &str) {
        self.jobs.write().await.remove(id);
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).map(|slot| slot.job.clone())
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Transitions a job to a new state. Terminal states are never
    /// overwritten; returns whether the transition was applied.
    pub async fn set_state(&self, id: &str, state: JobState) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(slot) = jobs.get_mut(id) else {
            return false;
        };
        if slot.job.state.is_terminal() {
            return false;
        }
        debug!(job_id = id, from = slot.job.state.state_type(), to = state.state_type(), "job transition");
        slot.job.state = state;
        slot.job.updated_at = Utc::now();
        true
    }

    /// Updates acquisition progress; a no-op unless the job is Acquiring.
    pub async fn update_progress(&self, id: &str, progress: FetchProgress) {
        let mut jobs = self.jobs.write().await;
        if let Some(slot) = jobs.get_mut(id) {
            if matches!(slot.job.state, JobState::Acquiring { .. }) {
                slot.job.state = JobState::Acquiring {
                    progress: Some(progress),
                };
                slot.job.updated_at = Utc::now();
            }
        }
    }

    /// Raises the cancellation flag for a job. Pending jobs are marked
    /// Cancelled immediately; running jobs observe the flag.
    pub async fn request_cancel(&self, id: &str) -> CancelOutcome {
        let mut jobs = self.jobs.write().await;
        let Some(slot) = jobs.get_mut(id) else {
            return CancelOutcome::NotFound;
        };
        if slot.job.state.is_terminal() {
            return CancelOutcome::AlreadyTerminal;
        }

        if matches!(slot.job.state, JobState::Pending) {
            slot.job.state = JobState::Cancelled;
            slot.job.updated_at = Utc::now();
        }

        let _ = slot.cancel_tx.send(true);
        CancelOutcome::Requested
    }

    /// Receiver for a job's cancellation flag.
    pub async fn cancel_receiver(&self, id: &str) -> Option<watch::Receiver<bool>> {
        self.jobs
            .read()
            .await
            .get(id)
            .map(|slot| slot.cancel_tx.subscribe())
    }

    /// Removes terminal jobs older than the retention window. Returns the
    /// number reclaimed.
    pub async fn sweep_terminal(&self, retention_secs: u64) -> usize {
        let cutoff = Utc::now() - ChronoDuration::seconds(retention_secs as i64);
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, slot| !(slot.job.state.is_terminal() && slot.job.updated_at < cutoff));
        before - jobs.len()
    }
}
