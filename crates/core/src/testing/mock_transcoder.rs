//! Mock transcoder for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::transcoder::{
    mime_for_extension, MediaProbe, TranscodeError, TranscodeOutcome, TranscodeRequest, Transcoder,
};

/// How the mock responds to transcode requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockTranscodeBehavior {
    /// Produce the canonical artifact and consume the input.
    Encode,
    /// Fail the encoder but honor the fallback contract: the raw input is
    /// moved into place under its own extension with a warning.
    Fallback,
    /// Fail outright (input not usable as audio).
    Fail,
}

/// A recorded transcode request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTranscode {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

/// Mock implementation of the Transcoder trait.
#[derive(Clone)]
pub struct MockTranscoder {
    behavior: Arc<RwLock<MockTranscodeBehavior>>,
    transcodes: Arc<RwLock<Vec<RecordedTranscode>>>,
    transcode_duration_ms: Arc<RwLock<u64>>,
    /// Probe duration reported for any path.
    probe_duration_secs: Arc<RwLock<f64>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self {
            behavior: Arc::new(RwLock::new(MockTranscodeBehavior::Encode)),
            transcodes: Arc::new(RwLock::new(Vec::new())),
            transcode_duration_ms: Arc::new(RwLock::new(5)),
            probe_duration_secs: Arc::new(RwLock::new(180.0)),
        }
    }

    /// Sets the behavior for subsequent transcode calls.
    pub async fn set_behavior(&self, behavior: MockTranscodeBehavior) {
        *self.behavior.write().await = behavior;
    }

    /// Sets the simulated transcode duration.
    pub async fn set_transcode_duration(&self, duration: Duration) {
        *self.transcode_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Sets the probe duration reported for any file.
    pub async fn set_probe_duration(&self, secs: f64) {
        *self.probe_duration_secs.write().await = secs;
    }

    /// Recorded transcode requests.
    pub async fn recorded_transcodes(&self) -> Vec<RecordedTranscode> {
        self.transcodes.read().await.clone()
    }

    pub async fn transcode_count(&self) -> usize {
        self.transcodes.read().await.len()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaProbe, TranscodeError> {
        if !path.exists() {
            return Err(TranscodeError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let size_bytes = tokio::fs::metadata(path).await?.len();
        Ok(MediaProbe {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs: *self.probe_duration_secs.read().await,
            format: "mock".to_string(),
            audio_codec: Some("aac".to_string()),
            audio_bitrate_kbps: Some(128),
        })
    }

    async fn transcode(&self, req: TranscodeRequest) -> Result<TranscodeOutcome, TranscodeError> {
        if !req.input_path.exists() {
            return Err(TranscodeError::InputNotFound {
                path: req.input_path.clone(),
            });
        }

        self.transcodes.write().await.push(RecordedTranscode {
            input_path: req.input_path.clone(),
            output_path: req.output_path.clone(),
        });

        let duration_ms = *self.transcode_duration_ms.read().await;
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;

        if let Some(parent) = req.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match *self.behavior.read().await {
            MockTranscodeBehavior::Encode => {
                let input_bytes = tokio::fs::read(&req.input_path).await?;
                tokio::fs::write(&req.output_path, &input_bytes).await?;
                tokio::fs::remove_file(&req.input_path).await?;

                let ext = req
                    .output_path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("mp3");

                Ok(TranscodeOutcome {
                    mime_type: mime_for_extension(ext).to_string(),
                    size_bytes: input_bytes.len() as u64,
                    artifact_path: req.output_path,
                    duration_ms,
                    fallback: false,
                    warning: None,
                })
            }
            MockTranscodeBehavior::Fallback => {
                let ext = req
                    .input_path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("bin")
                    .to_string();
                let artifact_path = req.output_path.with_extension(&ext);
                crate::fsops::move_file(&req.input_path, &artifact_path).await?;

                let size_bytes = tokio::fs::metadata(&artifact_path).await?.len();

                Ok(TranscodeOutcome {
                    artifact_path,
                    mime_type: mime_for_extension(&ext).to_string(),
                    size_bytes,
                    duration_ms,
                    fallback: true,
                    warning: Some(format!(
                        "encoder failed (mock); published raw {} file unchanged",
                        ext
                    )),
                })
            }
            MockTranscodeBehavior::Fail => Err(TranscodeError::encode_failed(
                "mock encoder failure",
                None,
            )),
        }
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        Ok(())
    }
}
