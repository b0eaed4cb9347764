//! Job orchestrator implementation.
//!
//! Drives each submitted job through the pipeline:
//! `Pending -> Acquiring -> Transcoding -> Publishing -> Completed`,
//! with a terminal-failure exit at every step. Jobs run on a bounded worker
//! pool consuming a queue, so submission returns immediately and subprocess
//! spawning is never unbounded.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::feed::{Entry, FeedError, FeedStore};
use crate::fetcher::{FetchError, MediaFetcher};
use crate::ident;
use crate::metrics;
use crate::resolver::{self, ResolveError};
use crate::fsops;
use crate::transcoder::{TranscodeError, TranscodeRequest, Transcoder};

use super::registry::{CancelOutcome, JobRegistry};
use super::types::{
    CancelError, Job, JobState, OrchestratorStatus, SourceReference, SubmitError, SubmitRequest,
};

/// Queue messages are job ids; the registry holds the jobs themselves.
type JobQueue = mpsc::Receiver<String>;

/// Errors inside a running pipeline, mapped onto the job's failure taxonomy.
#[derive(Debug, Error)]
enum PipelineError {
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("conversion failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("feed update failed: {0}")]
    Feed(#[from] FeedError),

    #[error("invalid source: {0}")]
    Resolve(#[from] ResolveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    fn category(&self) -> super::types::ErrorCategory {
        use super::types::ErrorCategory;
        match self {
            PipelineError::Fetch(_) => ErrorCategory::AcquisitionFailed,
            PipelineError::Transcode(_) => ErrorCategory::TranscodeFailed,
            PipelineError::Feed(_) => ErrorCategory::FeedPersist,
            PipelineError::Resolve(_) | PipelineError::Io(_) => ErrorCategory::Internal,
        }
    }
}

/// Result of a pipeline run that reached the feed store.
struct PublishOutcome {
    entry_id: String,
    duplicate: bool,
    warning: Option<String>,
}

/// Everything acquisition produces, for either source kind.
struct AcquiredInput {
    raw_path: PathBuf,
    entry_id: String,
    title: String,
    description: String,
    duration_secs: Option<u32>,
    published_at: DateTime<Utc>,
    source_link: Option<String>,
}

/// Shared dependencies cloned into each worker.
#[derive(Clone)]
struct WorkerCtx {
    config: Config,
    registry: Arc<JobRegistry>,
    fetcher: Arc<dyn MediaFetcher>,
    transcoder: Arc<dyn Transcoder>,
    feed: Arc<FeedStore>,
    publish_lock: Arc<Mutex<()>>,
}

/// The job orchestrator: owns the registry and the worker pool.
pub struct Orchestrator {
    ctx: WorkerCtx,
    queue_tx: mpsc::Sender<String>,
    queue_rx: std::sync::Mutex<Option<JobQueue>>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    /// Creates a new orchestrator. Call [`start`](Self::start) before
    /// submitting jobs.
    pub fn new(
        config: Config,
        fetcher: Arc<dyn MediaFetcher>,
        transcoder: Arc<dyn Transcoder>,
        feed: Arc<FeedStore>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.orchestrator.queue_capacity);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            ctx: WorkerCtx {
                config,
                registry: Arc::new(JobRegistry::new()),
                fetcher,
                transcoder,
                feed,
                publish_lock: Arc::new(Mutex::new(())),
            },
            queue_tx,
            queue_rx: std::sync::Mutex::new(Some(queue_rx)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Starts the worker pool and the retention sweep.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("orchestrator already running");
            return;
        }

        info!(
            workers = self.ctx.config.orchestrator.workers,
            queue = self.ctx.config.orchestrator.queue_capacity,
            "starting job orchestrator"
        );

        let Some(queue_rx) = self.queue_rx.lock().expect("queue mutex").take() else {
            // A stopped orchestrator cannot be restarted; its workers and
            // queue receiver are gone.
            warn!("orchestrator cannot be restarted after stop");
            self.running.store(false, Ordering::SeqCst);
            return;
        };
        let queue_rx = Arc::new(Mutex::new(queue_rx));

        for worker in 0..self.ctx.config.orchestrator.workers.max(1) {
            self.spawn_worker(worker, Arc::clone(&queue_rx));
        }

        self.spawn_sweep_loop();
    }

    /// Stops the orchestrator; in-flight jobs finish their current step.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("orchestrator not running");
            return;
        }

        info!("stopping job orchestrator");
        let _ = self.shutdown_tx.send(());
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    /// Submits a job. Remote locators are resolved synchronously, so a
    /// malformed source is rejected here and never creates a job.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Job, SubmitError> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(SubmitError::NotRunning);
        }

        if let SourceReference::RemoteLocator { url } = &request.source {
            resolver::resolve(url)?;
        }

        let job = Job::new(request.source, request.title, request.description);
        self.ctx.registry.insert(job.clone()).await;

        if self.queue_tx.try_send(job.id.clone()).is_err() {
            self.ctx.registry.remove(&job.id).await;
            return Err(SubmitError::Busy {
                capacity: self.ctx.config.orchestrator.queue_capacity,
            });
        }

        metrics::JOBS_SUBMITTED
            .with_label_values(&[job.source.kind()])
            .inc();
        info!(job_id = %job.id, source = job.source.kind(), "job submitted");

        Ok(job)
    }

    /// Snapshot of a job, valid until the retention sweep reclaims it.
    pub async fn get_job(&self, id: &str) -> Option<Job> {
        self.ctx.registry.get(id).await
    }

    /// Requests cancellation of a job.
    pub async fn cancel(&self, id: &str) -> Result<(), CancelError> {
        match self.ctx.registry.request_cancel(id).await {
            CancelOutcome::NotFound => Err(CancelError::NotFound(id.to_string())),
            CancelOutcome::AlreadyTerminal => Err(CancelError::AlreadyTerminal(id.to_string())),
            CancelOutcome::Requested => {
                info!(job_id = id, "job cancellation requested");
                Ok(())
            }
        }
    }

    /// Current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            running: self.running.load(Ordering::Relaxed),
            workers: self.ctx.config.orchestrator.workers,
            queue_capacity: self.ctx.config.orchestrator.queue_capacity,
            jobs: self.ctx.registry.len().await,
        }
    }

    /// Spawns one queue-consuming worker.
    fn spawn_worker(&self, worker: usize, queue_rx: Arc<Mutex<JobQueue>>) {
        let ctx = self.ctx.clone();
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            debug!(worker, "worker started");
            loop {
                let job_id = {
                    let mut rx = queue_rx.lock().await;
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        msg = rx.recv() => match msg {
                            Some(id) => id,
                            None => break,
                        },
                    }
                };

                if !running.load(Ordering::Relaxed) {
                    break;
                }

                Self::run_job(&ctx, &job_id).await;
            }
            debug!(worker, "worker stopped");
        });
    }

    /// Spawns the terminal-job retention sweep.
    fn spawn_sweep_loop(&self) {
        let registry = Arc::clone(&self.ctx.registry);
        let retention_secs = self.ctx.config.orchestrator.job_retention_secs;
        let interval = Duration::from_secs(self.ctx.config.orchestrator.sweep_interval_secs.max(1));
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let removed = registry.sweep_terminal(retention_secs).await;
                        if removed > 0 {
                            info!(removed, "reclaimed terminal jobs");
                        }
                    }
                }
            }
        });
    }

    /// Runs one job to a terminal state, cleaning scratch space either way.
    async fn run_job(ctx: &WorkerCtx, job_id: &str) {
        let Some(job) = ctx.registry.get(job_id).await else {
            return;
        };

        // Cancelled while still queued: nothing ran, only intake to clean.
        if job.state.is_terminal() {
            if let SourceReference::UploadedBytes { path, .. } = &job.source {
                let _ = tokio::fs::remove_file(path).await;
            }
            return;
        }

        ctx.registry
            .set_state(job_id, JobState::Acquiring { progress: None })
            .await;

        let scratch = ctx.config.storage.scratch_dir().join(job_id);
        let cancel_rx = ctx.registry.cancel_receiver(job_id).await;

        let result = tokio::select! {
            res = Self::run_pipeline(ctx, &job, &scratch) => Some(res),
            _ = wait_cancelled(cancel_rx) => None,
        };

        match result {
            Some(Ok(outcome)) => {
                let label = if outcome.duplicate {
                    "duplicate"
                } else {
                    "published"
                };
                metrics::JOB_OUTCOMES.with_label_values(&[label]).inc();
                info!(
                    job_id,
                    entry_id = %outcome.entry_id,
                    duplicate = outcome.duplicate,
                    "job completed"
                );
                ctx.registry
                    .set_state(
                        job_id,
                        JobState::Completed {
                            entry_id: outcome.entry_id,
                            duplicate: outcome.duplicate,
                            warning: outcome.warning,
                        },
                    )
                    .await;
            }
            Some(Err(e)) => {
                metrics::JOB_OUTCOMES.with_label_values(&["failed"]).inc();
                warn!(job_id, error = %e, "job failed");
                ctx.registry
                    .set_state(
                        job_id,
                        JobState::Failed {
                            category: e.category(),
                            message: e.to_string(),
                        },
                    )
                    .await;
            }
            None => {
                // The select dropped the pipeline future; subprocesses die
                // through kill_on_drop.
                metrics::JOB_OUTCOMES.with_label_values(&["cancelled"]).inc();
                info!(job_id, "job cancelled");
                ctx.registry.set_state(job_id, JobState::Cancelled).await;
            }
        }

        match tokio::fs::remove_dir_all(&scratch).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(job_id, scratch = ?scratch, error = %e, "failed to clean scratch dir"),
        }
    }

    /// The linear pipeline: acquire, transcode, publish.
    async fn run_pipeline(
        ctx: &WorkerCtx,
        job: &Job,
        scratch: &Path,
    ) -> Result<PublishOutcome, PipelineError> {
        tokio::fs::create_dir_all(scratch).await?;

        let input = Self::acquire(ctx, job, scratch).await?;

        ctx.registry.set_state(&job.id, JobState::Transcoding).await;

        let target_ext = ctx.config.transcoder.target_format.extension();
        let output_path = ctx
            .config
            .storage
            .media_dir()
            .join(format!("{}.{}", input.entry_id, target_ext));

        let transcode_started = Instant::now();
        let outcome = match ctx
            .transcoder
            .transcode(TranscodeRequest {
                input_path: input.raw_path.clone(),
                output_path,
            })
            .await
        {
            Ok(outcome) => {
                let label = if outcome.fallback { "fallback" } else { "encoded" };
                metrics::TRANSCODE_DURATION
                    .with_label_values(&[label])
                    .observe(transcode_started.elapsed().as_secs_f64());
                if outcome.fallback {
                    metrics::TRANSCODE_FALLBACKS.inc();
                }
                outcome
            }
            Err(e) => {
                metrics::TRANSCODE_DURATION
                    .with_label_values(&["failed"])
                    .observe(transcode_started.elapsed().as_secs_f64());
                return Err(e.into());
            }
        };

        ctx.registry.set_state(&job.id, JobState::Publishing).await;

        let file_name = outcome
            .artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.{}", input.entry_id, target_ext));
        let media_url = format!(
            "{}/{}",
            ctx.config.feed.media_base_url.trim_end_matches('/'),
            file_name
        );

        let entry = Entry {
            id: input.entry_id.clone(),
            title: input.title,
            description: input.description,
            duration_secs: input.duration_secs,
            media_url,
            mime_type: outcome.mime_type,
            file_size_bytes: outcome.size_bytes,
            published_at: input.published_at,
            source_link: input.source_link,
        };

        // Two jobs resolving to the same entry id must not race independent
        // add_entry calls; the lock spans the whole publish step.
        let add = {
            let _guard = ctx.publish_lock.lock().await;
            ctx.feed.add_entry(entry).await
        };

        let add = match add {
            Ok(add) => add,
            Err(e) => {
                metrics::FEED_PERSIST_FAILURES.inc();
                return Err(e.into());
            }
        };

        Ok(PublishOutcome {
            entry_id: input.entry_id,
            duplicate: add.duplicate,
            warning: outcome.warning,
        })
    }

    /// Acquires the raw input for either source kind.
    async fn acquire(
        ctx: &WorkerCtx,
        job: &Job,
        scratch: &Path,
    ) -> Result<AcquiredInput, PipelineError> {
        match &job.source {
            SourceReference::RemoteLocator { url } => {
                let source_id = resolver::resolve(url)?;

                let (progress_tx, mut progress_rx) = mpsc::channel(32);
                let registry = Arc::clone(&ctx.registry);
                let job_id = job.id.clone();
                let relay = tokio::spawn(async move {
                    while let Some(progress) = progress_rx.recv().await {
                        registry.update_progress(&job_id, progress).await;
                    }
                });

                let started = Instant::now();
                let fetched = ctx
                    .fetcher
                    .fetch(&source_id, scratch, Some(progress_tx))
                    .await;
                let _ = relay.await;

                let fetched = match fetched {
                    Ok(fetched) => {
                        metrics::ACQUIRE_DURATION
                            .with_label_values(&["success"])
                            .observe(started.elapsed().as_secs_f64());
                        fetched
                    }
                    Err(e) => {
                        metrics::ACQUIRE_DURATION
                            .with_label_values(&["failed"])
                            .observe(started.elapsed().as_secs_f64());
                        return Err(e.into());
                    }
                };

                let meta = fetched.metadata;
                let title = job
                    .title_override
                    .clone()
                    .unwrap_or_else(|| meta.title.clone());
                let description = job
                    .description_override
                    .clone()
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| {
                        if meta.description.is_empty() {
                            title.clone()
                        } else {
                            meta.description.clone()
                        }
                    });

                Ok(AcquiredInput {
                    raw_path: fetched.media_path,
                    entry_id: ident::entry_id_for_source(&source_id),
                    title,
                    description,
                    duration_secs: meta.duration_secs,
                    published_at: meta.upload_date.unwrap_or_else(Utc::now),
                    source_link: meta
                        .webpage_url
                        .clone()
                        .or_else(|| Some(ctx.config.fetcher.watch_url(source_id.as_str()))),
                })
            }

            SourceReference::UploadedBytes {
                path,
                original_name,
            } => {
                let ext = sanitize_extension(original_name);
                let raw_path = scratch.join(format!("upload.{}", ext));
                fsops::move_file(path, &raw_path).await?;

                // The id hashes the raw bytes, before any transcoding.
                let entry_id = ident::entry_id_for_file(&raw_path).await?;

                let duration_secs = match ctx.transcoder.probe(&raw_path).await {
                    Ok(probe) if probe.duration_secs > 0.0 => {
                        Some(probe.duration_secs.round() as u32)
                    }
                    _ => None,
                };

                let stem = Path::new(original_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| entry_id.clone());
                let title = job.title_override.clone().unwrap_or(stem);
                let description = job
                    .description_override
                    .clone()
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| title.clone());

                Ok(AcquiredInput {
                    raw_path,
                    entry_id,
                    title,
                    description,
                    duration_secs,
                    published_at: Utc::now(),
                    source_link: None,
                })
            }
        }
    }
}

/// Resolves when the job's cancellation flag is raised; pends forever when
/// there is no flag to watch.
async fn wait_cancelled(rx: Option<watch::Receiver<bool>>) {
    match rx {
        Some(mut rx) => {
            if *rx.borrow() {
                return;
            }
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return;
                }
            }
            // Sender gone: the job slot was reclaimed, never cancel.
            std::future::pending::<()>().await
        }
        None => std::future::pending().await,
    }
}

/// Lowercased, charset-restricted extension for an uploaded file name.
fn sanitize_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}
