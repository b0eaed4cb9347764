//! Feed entry API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use podsmith_core::{metrics, Entry};

use super::ErrorBody;
use crate::state::AppState;

/// A feed entry in API responses.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    pub media_url: String,
    pub mime_type: String,
    pub file_size_bytes: u64,
    pub published_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
}

impl From<Entry> for EntryResponse {
    fn from(entry: Entry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            description: entry.description,
            duration_secs: entry.duration_secs,
            media_url: entry.media_url,
            mime_type: entry.mime_type,
            file_size_bytes: entry.file_size_bytes,
            published_at: entry.published_at.to_rfc3339(),
            source_link: entry.source_link,
        }
    }
}

/// Response for listing entries.
#[derive(Debug, Serialize)]
pub struct ListEntriesResponse {
    pub entries: Vec<EntryResponse>,
    pub count: usize,
}

/// Response for entry deletion.
#[derive(Debug, Serialize)]
pub struct DeleteEntryResponse {
    pub found: bool,
}

/// List feed entries, newest first, presentation-capped.
pub async fn list_entries(State(state): State<Arc<AppState>>) -> Json<ListEntriesResponse> {
    let entries = state.feed().list_entries().await;
    let count = entries.len();
    Json(ListEntriesResponse {
        entries: entries.into_iter().map(EntryResponse::from).collect(),
        count,
    })
}

/// Delete an entry and its media artifact. An unknown id is reported, not
/// an error.
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteEntryResponse>, (StatusCode, Json<ErrorBody>)> {
    match state.feed().delete_entry(&id).await {
        Ok(found) => {
            if found {
                metrics::ENTRIES_DELETED.inc();
            }
            Ok(Json(DeleteEntryResponse { found }))
        }
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(e.to_string())),
        )),
    }
}
