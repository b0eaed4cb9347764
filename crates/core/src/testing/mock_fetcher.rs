//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::fetcher::{FetchError, FetchProgress, FetchedMedia, MediaFetcher, MediaMetadata};
use crate::resolver::CanonicalSourceId;

/// Mock implementation of the MediaFetcher trait.
///
/// Provides controllable behavior for testing:
/// - Configure per-source metadata
/// - Control the bytes "downloaded"
/// - Simulate failures and slow transfers
/// - Emit progress events
#[derive(Clone)]
pub struct MockFetcher {
    /// Pre-configured metadata by source id.
    metadata: Arc<RwLock<HashMap<String, MediaMetadata>>>,
    /// If set, the next fetch/probe fails with this error.
    next_error: Arc<RwLock<Option<FetchError>>>,
    /// Bytes written as the fetched media file.
    media_contents: Arc<RwLock<Vec<u8>>>,
    /// Extension of the fetched media file.
    media_extension: Arc<RwLock<String>>,
    /// Simulated transfer duration.
    fetch_duration_ms: Arc<RwLock<u64>>,
    /// Whether to emit progress events during fetch.
    send_progress: Arc<RwLock<bool>>,
    /// Source ids fetched, in order.
    fetches: Arc<RwLock<Vec<String>>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            metadata: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            media_contents: Arc::new(RwLock::new(b"mock media bytes".to_vec())),
            media_extension: Arc::new(RwLock::new("m4a".to_string())),
            fetch_duration_ms: Arc::new(RwLock::new(5)),
            send_progress: Arc::new(RwLock::new(true)),
            fetches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Sets metadata returned for a source id.
    pub async fn set_metadata(&self, source_id: impl Into<String>, metadata: MediaMetadata) {
        self.metadata.write().await.insert(source_id.into(), metadata);
    }

    /// Configures the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Sets the bytes written as the fetched file.
    pub async fn set_media_contents(&self, contents: Vec<u8>) {
        *self.media_contents.write().await = contents;
    }

    /// Sets the extension of the fetched file (simulating the tool's
    /// best-stream container choice).
    pub async fn set_media_extension(&self, ext: impl Into<String>) {
        *self.media_extension.write().await = ext.into();
    }

    /// Sets the simulated transfer duration.
    pub async fn set_fetch_duration(&self, duration: Duration) {
        *self.fetch_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Enables or disables progress events.
    pub async fn set_send_progress(&self, send: bool) {
        *self.send_progress.write().await = send;
    }

    /// Source ids fetched so far.
    pub async fn recorded_fetches(&self) -> Vec<String> {
        self.fetches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    async fn take_error(&self) -> Option<FetchError> {
        self.next_error.write().await.take()
    }

    fn default_metadata(source_id: &str) -> MediaMetadata {
        MediaMetadata {
            source_id: source_id.to_string(),
            title: format!("Episode {}", source_id),
            description: format!("Description for {}", source_id),
            duration_secs: Some(180),
            upload_date: MediaMetadata::parse_upload_date("20240101"),
            uploader: Some("Mock Channel".to_string()),
            thumbnail_url: None,
            webpage_url: Some(format!("https://www.youtube.com/watch?v={}", source_id)),
        }
    }

    async fn metadata_for(&self, source_id: &str) -> MediaMetadata {
        self.metadata
            .read()
            .await
            .get(source_id)
            .cloned()
            .unwrap_or_else(|| Self::default_metadata(source_id))
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, source: &CanonicalSourceId) -> Result<MediaMetadata, FetchError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        Ok(self.metadata_for(source.as_str()).await)
    }

    async fn fetch(
        &self,
        source: &CanonicalSourceId,
        dest_dir: &Path,
        progress_tx: Option<mpsc::Sender<FetchProgress>>,
    ) -> Result<FetchedMedia, FetchError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        self.fetches.write().await.push(source.as_str().to_string());

        let duration_ms = *self.fetch_duration_ms.read().await;
        let send_progress = *self.send_progress.read().await;

        if send_progress {
            if let Some(ref tx) = progress_tx {
                for percent in [25.0, 50.0, 100.0] {
                    let _ = tx
                        .send(FetchProgress {
                            percent,
                            rate: Some("1.00MiB/s".to_string()),
                            eta: Some("00:10".to_string()),
                        })
                        .await;
                    tokio::time::sleep(Duration::from_millis(duration_ms / 3)).await;
                }
            }
        } else {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let ext = self.media_extension.read().await.clone();
        let media_path = dest_dir.join(format!("{}.{}", source.as_str(), ext));
        tokio::fs::write(&media_path, &*self.media_contents.read().await).await?;

        Ok(FetchedMedia {
            media_path,
            metadata: self.metadata_for(source.as_str()).await,
        })
    }

    async fn validate(&self) -> Result<(), FetchError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver;

    #[tokio::test]
    async fn test_mock_fetch_writes_file_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new();
        let source = resolver::resolve("https://youtu.be/dQw4w9WgXcQ").unwrap();

        let fetched = fetcher.fetch(&source, dir.path(), None).await.unwrap();
        assert!(fetched.media_path.exists());
        assert_eq!(fetched.metadata.source_id, "dQw4w9WgXcQ");
        assert_eq!(fetcher.recorded_fetches().await, vec!["dQw4w9WgXcQ"]);
    }

    #[tokio::test]
    async fn test_mock_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new();
        fetcher
            .set_next_error(FetchError::extraction_failed("video unavailable", None))
            .await;

        let source = resolver::resolve("https://youtu.be/dQw4w9WgXcQ").unwrap();
        let result = fetcher.fetch(&source, dir.path(), None).await;
        assert!(matches!(result, Err(FetchError::ExtractionFailed { .. })));
        assert_eq!(fetcher.fetch_count().await, 0);
    }

    #[tokio::test]
    async fn test_mock_fetch_sends_progress() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new();
        let source = resolver::resolve("https://youtu.be/dQw4w9WgXcQ").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        fetcher.fetch(&source, dir.path(), Some(tx)).await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert_eq!(events.last().unwrap().percent, 100.0);
    }
}
