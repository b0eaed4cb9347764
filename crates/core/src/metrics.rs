//! Prometheus metrics for core components.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

/// Jobs submitted, by source kind.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("podsmith_jobs_submitted_total", "Total jobs submitted"),
        &["source"], // "remote", "upload"
    )
    .unwrap()
});

/// Terminal job outcomes.
pub static JOB_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("podsmith_job_outcomes_total", "Terminal job outcomes"),
        &["result"], // "published", "duplicate", "failed", "cancelled"
    )
    .unwrap()
});

/// Acquisition duration in seconds.
pub static ACQUIRE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "podsmith_acquire_duration_seconds",
            "Duration of the acquisition step",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0, 1800.0]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Transcode duration in seconds.
pub static TRANSCODE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "podsmith_transcode_duration_seconds",
            "Duration of the transcode step",
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0]),
        &["result"], // "encoded", "fallback", "failed"
    )
    .unwrap()
});

/// Transcode fallbacks applied (raw file published unchanged).
pub static TRANSCODE_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "podsmith_transcode_fallbacks_total",
        "Encoder failures absorbed by publishing the raw audio file",
    )
    .unwrap()
});

/// Feed persist failures.
pub static FEED_PERSIST_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "podsmith_feed_persist_failures_total",
        "Atomic feed saves that failed",
    )
    .unwrap()
});

/// Entries deleted from the feed.
pub static ENTRIES_DELETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "podsmith_entries_deleted_total",
        "Entries explicitly deleted from the feed",
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOB_OUTCOMES.clone()),
        Box::new(ACQUIRE_DURATION.clone()),
        Box::new(TRANSCODE_DURATION.clone()),
        Box::new(TRANSCODE_FALLBACKS.clone()),
        Box::new(FEED_PERSIST_FAILURES.clone()),
        Box::new(ENTRIES_DELETED.clone()),
    ]
}
