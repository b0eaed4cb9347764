use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::fetcher::FetcherConfig;
use crate::jobs::OrchestratorConfig;
use crate::transcoder::TranscoderConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Published feed (channel) configuration.
///
/// `site_url` and `media_base_url` are the only required settings in the
/// whole file: without them the enclosure URLs in the published feed would
/// be meaningless to external readers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Public base URL of the feed site.
    pub site_url: String,
    /// Public base URL under which media artifacts are reachable.
    pub media_base_url: String,
    #[serde(default = "default_feed_title")]
    pub title: String,
    #[serde(default = "default_feed_description")]
    pub description: String,
    #[serde(default = "default_feed_author")]
    pub author: String,
    #[serde(default = "default_feed_language")]
    pub language: String,
    #[serde(default = "default_feed_category")]
    pub category: String,
    /// Presentation cap for listings and the rendered feed. Entries beyond
    /// the cap stay in the store and keep their media.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_feed_title() -> String {
    "Podsmith Feed".to_string()
}

fn default_feed_description() -> String {
    "Personal podcast feed generated from media sources".to_string()
}

fn default_feed_author() -> String {
    "Podsmith".to_string()
}

fn default_feed_language() -> String {
    "en".to_string()
}

fn default_feed_category() -> String {
    "Technology".to_string()
}

fn default_max_items() -> usize {
    50
}

/// Durable storage layout. Everything lives under one data directory that
/// must survive restarts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl StorageConfig {
    /// Directory holding published media artifacts.
    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }

    /// The persisted feed document (source of truth).
    pub fn feed_document_path(&self) -> PathBuf {
        self.data_dir.join("feed.json")
    }

    /// The rendered RSS document consumed by external readers.
    pub fn rss_path(&self) -> PathBuf {
        self.data_dir.join("feed.xml")
    }

    /// Per-job scratch space for raw acquired media.
    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("scratch")
    }

    /// Intake directory for uploaded files awaiting a job.
    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Creates all storage directories.
    pub async fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [self.media_dir(), self.scratch_dir(), self.upload_dir()] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}
