use std::sync::Arc;

use podsmith_core::{Config, FeedStore, Orchestrator};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<Orchestrator>,
    feed: Arc<FeedStore>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<Orchestrator>, feed: Arc<FeedStore>) -> Self {
        Self {
            config,
            orchestrator,
            feed,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn feed(&self) -> &FeedStore {
        &self.feed
    }
}
