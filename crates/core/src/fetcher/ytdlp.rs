//! yt-dlp based fetcher implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::resolver::CanonicalSourceId;

use super::config::FetcherConfig;
use super::error::FetchError;
use super::traits::MediaFetcher;
use super::types::{FetchProgress, FetchedMedia, MediaMetadata};

/// yt-dlp based fetcher implementation.
pub struct YtdlpFetcher {
    config: FetcherConfig,
}

impl YtdlpFetcher {
    /// Creates a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// Creates a fetcher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FetcherConfig::default())
    }

    /// Builds download arguments for a source.
    fn build_download_args(&self, url: &str, dest_dir: &Path, id: &str) -> Vec<String> {
        let output_template = dest_dir.join(format!("{}.%(ext)s", id));

        let mut args = vec![
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().to_string(),
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];

        args.extend(self.config.extra_args.iter().cloned());
        args.push(url.to_string());

        args
    }

    /// Parses the tool's `--dump-json` output into metadata.
    fn parse_metadata(output: &str) -> Result<MediaMetadata, FetchError> {
        #[derive(Deserialize)]
        struct ToolInfo {
            id: String,
            title: Option<String>,
            description: Option<String>,
            duration: Option<f64>,
            upload_date: Option<String>,
            uploader: Option<String>,
            thumbnail: Option<String>,
            webpage_url: Option<String>,
        }

        let info: ToolInfo =
            serde_json::from_str(output).map_err(|e| FetchError::MetadataParse {
                reason: format!("failed to parse tool output: {}", e),
            })?;

        let title = info
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Unknown Title".to_string());

        Ok(MediaMetadata {
            source_id: info.id,
            title,
            description: info.description.unwrap_or_default(),
            duration_secs: info.duration.map(|d| d.round() as u32),
            upload_date: info
                .upload_date
                .as_deref()
                .and_then(MediaMetadata::parse_upload_date),
            uploader: info.uploader,
            thumbnail_url: info.thumbnail,
            webpage_url: info.webpage_url,
        })
    }

    /// Parses a `--newline` progress line, if it is one.
    ///
    /// Lines look like `[download]  42.1% of 10.00MiB at 1.23MiB/s ETA 00:31`.
    fn parse_progress_line(line: &str) -> Option<FetchProgress> {
        if !line.starts_with("[download]") {
            return None;
        }

        let percent_re = Regex::new(r"(\d+(?:\.\d+)?)%").ok()?;
        let rate_re = Regex::new(r"\bat\s+(\S+)").ok()?;
        let eta_re = Regex::new(r"\bETA\s+(\S+)").ok()?;

        let percent = percent_re
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f32>().ok())?;

        let rate = rate_re
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|r| r != "Unknown");

        let eta = eta_re
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|e| e != "Unknown");

        Some(FetchProgress { percent, rate, eta })
    }

    /// Locates the downloaded file in `dest_dir` by its stem.
    ///
    /// The extension is chosen by the tool based on the best available
    /// stream, so it is not known up front.
    async fn find_output(dest_dir: &Path, id: &str) -> Result<PathBuf, FetchError> {
        let mut entries = tokio::fs::read_dir(dest_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file()
                && path.file_stem().and_then(|s| s.to_str()) == Some(id)
                && !path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == "part" || e == "tmp")
            {
                return Ok(path);
            }
        }

        Err(FetchError::OutputMissing {
            path: dest_dir.join(id),
        })
    }

    /// Runs the download subprocess, relaying progress.
    async fn run_download(
        &self,
        url: &str,
        dest_dir: &Path,
        id: &str,
        progress_tx: Option<mpsc::Sender<FetchProgress>>,
    ) -> Result<PathBuf, FetchError> {
        let args = self.build_download_args(url, dest_dir, id);
        debug!(tool = ?self.config.ytdlp_path, ?args, "starting download");

        let mut child = Command::new(&self.config.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::ToolNotFound {
                        path: self.config.ytdlp_path.clone(),
                    }
                } else {
                    FetchError::Io(e)
                }
            })?;

        let stdout = child.stdout.take().expect("stdout should be captured");
        let stderr = child.stderr.take().expect("stderr should be captured");
        let mut reader = BufReader::new(stdout).lines();

        // Drain stderr concurrently so a full pipe never stalls the tool.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let mut stderr = stderr;
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut last_progress_send = Instant::now();
            let progress_interval = Duration::from_millis(500);

            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(progress) = Self::parse_progress_line(&line) {
                    if let Some(ref tx) = progress_tx {
                        // Throttle updates; completion is always delivered.
                        if last_progress_send.elapsed() >= progress_interval
                            || progress.percent >= 100.0
                        {
                            let _ = tx.try_send(progress);
                            last_progress_send = Instant::now();
                        }
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<std::process::ExitStatus, std::io::Error>(status)
        })
        .await;

        let error_output = match &result {
            Ok(Ok(_)) | Ok(Err(_)) => stderr_task.await.unwrap_or_default(),
            // On timeout the child is killed below; the drain task ends with
            // the closed pipe.
            Err(_) => String::new(),
        };

        match result {
            Ok(Ok(status)) => {
                if !status.success() {
                    return Err(FetchError::extraction_failed(
                        format!("tool exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Ok(Err(e)) => return Err(FetchError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(FetchError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        Self::find_output(dest_dir, id).await
    }
}

#[async_trait]
impl MediaFetcher for YtdlpFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(&self, source: &CanonicalSourceId) -> Result<MediaMetadata, FetchError> {
        let url = self.config.watch_url(source.as_str());

        let output = timeout(
            Duration::from_secs(self.config.timeout_secs),
            Command::new(&self.config.ytdlp_path)
                .args(["--dump-json", "--no-download", "--no-playlist", "--no-warnings"])
                .arg(&url)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| FetchError::Timeout {
            timeout_secs: self.config.timeout_secs,
        })?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FetchError::ToolNotFound {
                    path: self.config.ytdlp_path.clone(),
                }
            } else {
                FetchError::Io(e)
            }
        })?;

        if !output.status.success() {
            return Err(FetchError::extraction_failed(
                format!("metadata extraction failed for {}", source),
                Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            ));
        }

        Self::parse_metadata(&String::from_utf8_lossy(&output.stdout))
    }

    async fn fetch(
        &self,
        source: &CanonicalSourceId,
        dest_dir: &Path,
        progress_tx: Option<mpsc::Sender<FetchProgress>>,
    ) -> Result<FetchedMedia, FetchError> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let metadata = self.probe(source).await?;
        let url = self.config.watch_url(source.as_str());

        let media_path = self
            .run_download(&url, dest_dir, source.as_str(), progress_tx)
            .await?;

        Ok(FetchedMedia {
            media_path,
            metadata,
        })
    }

    async fn validate(&self) -> Result<(), FetchError> {
        let result = Command::new(&self.config.ytdlp_path)
            .arg("--version")
            .output()
            .await;

        if let Err(e) = result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(FetchError::ToolNotFound {
                    path: self.config.ytdlp_path.clone(),
                });
            }
            return Err(FetchError::Io(e));
        }

        Ok(())
    }
}
