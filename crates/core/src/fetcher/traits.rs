//! Trait definitions for the fetcher module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use crate::resolver::CanonicalSourceId;

use super::error::FetchError;
use super::types::{FetchProgress, FetchedMedia, MediaMetadata};

/// A fetcher that can acquire raw media for a resolved remote source.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Retrieves descriptive metadata without downloading media.
    async fn probe(&self, source: &CanonicalSourceId) -> Result<MediaMetadata, FetchError>;

    /// Downloads the best audio-bearing stream into `dest_dir`.
    ///
    /// Progress events are delivered on `progress_tx` while the transfer is
    /// in flight; a dropped receiver never aborts the download.
    async fn fetch(
        &self,
        source: &CanonicalSourceId,
        dest_dir: &Path,
        progress_tx: Option<mpsc::Sender<FetchProgress>>,
    ) -> Result<FetchedMedia, FetchError>;

    /// Validates that the fetcher is properly configured and ready.
    async fn validate(&self) -> Result<(), FetchError>;
}
