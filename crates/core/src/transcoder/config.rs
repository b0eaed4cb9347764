//! Configuration for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::types::AudioFormat;

/// Configuration for the FFmpeg-based transcoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// The single canonical output format for the whole feed.
    #[serde(default = "default_target_format")]
    pub target_format: AudioFormat,

    /// VBR quality (0-9, 0 best). Used when no bitrate is set; mp3 only.
    #[serde(default = "default_vbr_quality")]
    pub vbr_quality: Option<u8>,

    /// CBR bitrate in kbps; overrides VBR quality when set.
    #[serde(default)]
    pub bitrate_kbps: Option<u32>,

    /// Timeout for a single encode in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Extensions accepted as directly publishable audio when the encoder
    /// fails (the fallback policy).
    #[serde(default = "default_fallback_formats")]
    pub fallback_formats: Vec<String>,

    /// FFmpeg log level.
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_target_format() -> AudioFormat {
    AudioFormat::Mp3
}

fn default_vbr_quality() -> Option<u8> {
    Some(2) // ~190 kbps
}

fn default_timeout() -> u64 {
    900 // 15 minutes
}

fn default_fallback_formats() -> Vec<String> {
    ["mp3", "m4a", "aac", "ogg", "opus", "flac", "wav"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            target_format: default_target_format(),
            vbr_quality: default_vbr_quality(),
            bitrate_kbps: None,
            timeout_secs: default_timeout(),
            fallback_formats: default_fallback_formats(),
            ffmpeg_log_level: default_log_level(),
        }
    }
}

impl TranscoderConfig {
    /// Whether an extension is acceptable as a fallback artifact.
    pub fn is_fallback_format(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.fallback_formats.iter().any(|f| f == &ext)
    }
}
