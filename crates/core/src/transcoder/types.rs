//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Canonical audio formats the feed can publish.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Mp3,
    M4a,
}

impl AudioFormat {
    /// Returns the ffmpeg codec name for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::M4a => "aac",
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
        }
    }

    /// Returns the enclosure MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
        }
    }
}

/// MIME type for an audio file extension, for artifacts published without
/// transcoding.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// A transcode request: raw input in, canonical artifact out.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    /// Path of the raw acquired media file.
    pub input_path: PathBuf,
    /// Deterministic output path for the canonical artifact (carries the
    /// target format's extension).
    pub output_path: PathBuf,
}

/// Result of a transcode, including the fallback case.
#[derive(Debug, Clone)]
pub struct TranscodeOutcome {
    /// Final artifact path. With `fallback`, this is the raw file moved
    /// next to the requested output under its own extension.
    pub artifact_path: PathBuf,
    /// Enclosure MIME type of the artifact.
    pub mime_type: String,
    /// Size of the artifact in bytes.
    pub size_bytes: u64,
    /// Wall-clock duration of the operation in milliseconds.
    pub duration_ms: u64,
    /// Whether the fallback policy produced this artifact.
    pub fallback: bool,
    /// Non-fatal warning recorded when the fallback absorbed an encoder
    /// failure.
    pub warning: Option<String>,
}

/// Probed information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_secs: f64,
    /// Container format name.
    pub format: String,
    pub audio_codec: Option<String>,
    pub audio_bitrate_kbps: Option<u32>,
}
