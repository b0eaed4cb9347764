//! Core feed data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One published unit in the ordered feed.
///
/// Created once at successful job completion; immutable thereafter except
/// for deletion. `id` is globally unique within the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    /// Content-derived token; also the artifact's base name.
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Duration in seconds, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    /// Public URL of the media artifact (enclosure url).
    pub media_url: String,
    /// Enclosure MIME type.
    pub mime_type: String,
    /// Enclosure byte length.
    #[serde(default)]
    pub file_size_bytes: u64,
    #[serde(default = "epoch")]
    pub published_at: DateTime<Utc>,
    /// Link back to the original source page, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Entry {
    /// File name of the backing media artifact, from the enclosure URL.
    pub fn artifact_file_name(&self) -> Option<&str> {
        self.media_url.rsplit('/').next().filter(|n| !n.is_empty())
    }
}

/// Outcome of an `add_entry` call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddOutcome {
    /// The entry was inserted and persisted.
    pub added: bool,
    /// The id was already present; state is unchanged.
    pub duplicate: bool,
}

impl AddOutcome {
    pub fn added() -> Self {
        Self {
            added: true,
            duplicate: false,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            added: false,
            duplicate: true,
        }
    }
}

/// The persisted feed document.
///
/// Every field except entry ids and enclosures is additive: readers of older
/// documents and external consumers must keep parsing when fields are absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeedDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Monotonic revision marker, bumped on every persisted mutation.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

fn default_version() -> u32 {
    1
}

impl FeedDocument {
    pub fn new(revision: u64, entries: Vec<Entry>) -> Self {
        Self {
            version: default_version(),
            revision,
            entries,
        }
    }
}
