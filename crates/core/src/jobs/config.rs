//! Configuration for the job orchestrator.

use serde::{Deserialize, Serialize};

/// Orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of worker tasks executing jobs. Bounds concurrent subprocess
    /// spawning; jobs beyond this queue.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the submission queue. Submissions beyond it are rejected
    /// rather than accepted unboundedly.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long terminal jobs remain queryable before the sweep reclaims
    /// them, in seconds.
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,

    /// Interval between retention sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_workers() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}

fn default_job_retention_secs() -> u64 {
    86_400 // 24 hours
}

fn default_sweep_interval_secs() -> u64 {
    300 // 5 minutes
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            job_retention_secs: default_job_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.job_retention_secs, 86_400);
        assert_eq!(config.sweep_interval_secs, 300);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: OrchestratorConfig = toml::from_str("workers = 8").unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.queue_capacity, 64);
    }
}
