//! Types for the fetcher module.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Descriptive metadata for a remote source, as reported by the extraction
/// tool before or during download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Source id as reported by the tool.
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Duration in seconds, when known.
    #[serde(default)]
    pub duration_secs: Option<u32>,
    /// Upload date, when known.
    #[serde(default)]
    pub upload_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Canonical page URL for the source.
    #[serde(default)]
    pub webpage_url: Option<String>,
}

impl MediaMetadata {
    /// Parses the tool's `YYYYMMDD` upload date into a UTC timestamp.
    pub fn parse_upload_date(raw: &str) -> Option<DateTime<Utc>> {
        NaiveDate::parse_from_str(raw, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// Duration formatted as `HH:MM:SS` (or `MM:SS` under an hour).
    pub fn formatted_duration(&self) -> Option<String> {
        self.duration_secs.map(format_duration)
    }
}

/// Formats a second count as `HH:MM:SS`, dropping the hour field when zero.
pub fn format_duration(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// A progress event emitted while a download is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchProgress {
    /// Completion percentage (0.0-100.0).
    pub percent: f32,
    /// Transfer rate as reported by the tool (e.g. "1.23MiB/s").
    #[serde(default)]
    pub rate: Option<String>,
    /// Estimated time remaining as reported by the tool (e.g. "00:31").
    #[serde(default)]
    pub eta: Option<String>,
}

/// Result of a successful acquisition: the raw media file plus metadata.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    /// Path of the raw media file inside the caller-provided scratch dir.
    pub media_path: PathBuf,
    pub metadata: MediaMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "00:59");
        assert_eq!(format_duration(61), "01:01");
        assert_eq!(format_duration(3600), "01:00:00");
        assert_eq!(format_duration(3725), "01:02:05");
    }

    #[test]
    fn test_parse_upload_date() {
        let dt = MediaMetadata::parse_upload_date("20240229").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-02-29T00:00:00+00:00");
        assert!(MediaMetadata::parse_upload_date("not-a-date").is_none());
    }

    #[test]
    fn test_progress_serialization() {
        let progress = FetchProgress {
            percent: 42.1,
            rate: Some("1.23MiB/s".to_string()),
            eta: Some("00:31".to_string()),
        };
        let json = serde_json::to_string(&progress).unwrap();
        let parsed: FetchProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, progress);
    }
}
