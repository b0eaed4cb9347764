//! Configuration for the fetcher module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the yt-dlp based fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Timeout for a single acquisition in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Template for the watch URL handed to the tool; `{id}` is replaced
    /// with the canonical source id.
    #[serde(default = "default_watch_url_template")]
    pub watch_url_template: String,

    /// Additional global tool arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_timeout() -> u64 {
    1800 // 30 minutes
}

fn default_watch_url_template() -> String {
    "https://www.youtube.com/watch?v={id}".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            timeout_secs: default_timeout(),
            watch_url_template: default_watch_url_template(),
            extra_args: Vec::new(),
        }
    }
}

impl FetcherConfig {
    /// Builds the watch URL for a canonical source id.
    pub fn watch_url(&self, id: &str) -> String {
        self.watch_url_template.replace("{id}", id)
    }
}
