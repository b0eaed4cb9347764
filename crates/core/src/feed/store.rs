//! The feed store: single-writer, atomically persisted entry collection.

use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{FeedConfig, StorageConfig};
use crate::fsops;

use super::error::FeedError;
use super::rss::render_rss;
use super::types::{AddOutcome, Entry, FeedDocument};

/// In-memory feed state guarded by the store's lock.
#[derive(Debug, Default)]
struct FeedState {
    revision: u64,
    /// Kept sorted by descending `published_at`.
    entries: Vec<Entry>,
}

/// The persistent, ordered, deduplicated collection of published entries.
///
/// Mutations take the write lock, so at most one add/delete/persist runs at
/// a time; reads snapshot concurrently through the read lock. Persistence is
/// a write-to-temp + atomic-rename of both the JSON document (source of
/// truth) and the rendered RSS.
pub struct FeedStore {
    state: RwLock<FeedState>,
    feed_config: FeedConfig,
    document_path: PathBuf,
    rss_path: PathBuf,
    media_dir: PathBuf,
}

impl FeedStore {
    /// Loads the store from the persisted document.
    ///
    /// An absent document is an empty feed; a corrupt one is a hard error.
    pub async fn load(feed_config: FeedConfig, storage: &StorageConfig) -> Result<Self, FeedError> {
        let document_path = storage.feed_document_path();

        let state = match tokio::fs::read(&document_path).await {
            Ok(bytes) => {
                let doc: FeedDocument =
                    serde_json::from_slice(&bytes).map_err(|e| FeedError::Corrupt {
                        path: document_path.clone(),
                        reason: e.to_string(),
                    })?;
                info!(
                    entries = doc.entries.len(),
                    revision = doc.revision,
                    "loaded feed document"
                );
                let mut entries = doc.entries;
                sort_entries(&mut entries);
                FeedState {
                    revision: doc.revision,
                    entries,
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = ?document_path, "no feed document, starting empty");
                FeedState::default()
            }
            Err(e) => return Err(FeedError::Io(e)),
        };

        Ok(Self {
            state: RwLock::new(state),
            feed_config,
            document_path,
            rss_path: storage.rss_path(),
            media_dir: storage.media_dir(),
        })
    }

    /// Adds an entry. An already-present id is a successful no-op: the
    /// persisted state is untouched and `duplicate` is reported.
    pub async fn add_entry(&self, entry: Entry) -> Result<AddOutcome, FeedError> {
        let mut state = self.state.write().await;

        if state.entries.iter().any(|e| e.id == entry.id) {
            return Ok(AddOutcome::duplicate());
        }

        let new_id = entry.id.clone();
        state.entries.push(entry);
        sort_entries(&mut state.entries);
        state.revision += 1;

        if let Err(e) = self.persist_locked(&state).await {
            // Disk still holds the previous revision; roll memory back to it.
            state.entries.retain(|e| e.id != new_id);
            state.revision -= 1;
            return Err(e);
        }

        Ok(AddOutcome::added())
    }

    /// Deletes an entry and its backing media artifact. Unknown ids report
    /// `false` without error.
    pub async fn delete_entry(&self, id: &str) -> Result<bool, FeedError> {
        let mut state = self.state.write().await;

        let Some(pos) = state.entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };

        let removed = state.entries.remove(pos);
        state.revision += 1;

        if let Err(e) = self.persist_locked(&state).await {
            state.entries.insert(pos, removed);
            state.revision -= 1;
            return Err(e);
        }

        // Entry removal is durable; artifact deletion is best-effort.
        if let Some(file_name) = removed.artifact_file_name() {
            let artifact = self.media_dir.join(file_name);
            match tokio::fs::remove_file(&artifact).await {
                Ok(()) => info!(?artifact, "deleted media artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(?artifact, error = %e, "failed to delete media artifact"),
            }
        }

        Ok(true)
    }

    /// Returns entries in descending publish order, capped for presentation.
    pub async fn list_entries(&self) -> Vec<Entry> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .take(self.feed_config.max_items)
            .cloned()
            .collect()
    }

    /// Whether an entry id is present.
    pub async fn contains(&self, id: &str) -> bool {
        self.state.read().await.entries.iter().any(|e| e.id == id)
    }

    /// Total number of stored entries (beyond the presentation cap).
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Current revision marker.
    pub async fn revision(&self) -> u64 {
        self.state.read().await.revision
    }

    /// Persists the current state: the JSON document and the derived RSS,
    /// each written to a temporary sibling and atomically renamed.
    async fn persist_locked(&self, state: &FeedState) -> Result<(), FeedError> {
        if let Some(parent) = self.document_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(FeedError::Persist)?;
        }

        let doc = FeedDocument::new(state.revision, state.entries.clone());
        let json = serde_json::to_vec_pretty(&doc).expect("feed document serializes");
        fsops::atomic_write(&self.document_path, &json)
            .await
            .map_err(FeedError::Persist)?;

        let capped: Vec<Entry> = state
            .entries
            .iter()
            .take(self.feed_config.max_items)
            .cloned()
            .collect();
        let xml = render_rss(&self.feed_config, &capped);
        fsops::atomic_write(&self.rss_path, xml.as_bytes())
            .await
            .map_err(FeedError::Persist)?;

        Ok(())
    }
}

/// Descending publish order; stable, so equal timestamps keep their
/// insertion order.
fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}
