//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use crate::fsops;

use super::config::TranscoderConfig;
use super::error::TranscodeError;
use super::traits::Transcoder;
use super::types::{mime_for_extension, MediaProbe, TranscodeOutcome, TranscodeRequest};

/// FFmpeg-based transcoder implementation.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds ffmpeg arguments for the audio encode.
    fn build_args(&self, input_path: &Path, output_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vn".to_string(), // Audio only
            "-acodec".to_string(),
            self.config.target_format.ffmpeg_codec().to_string(),
        ];

        // CBR overrides VBR when set
        if let Some(bitrate) = self.config.bitrate_kbps {
            args.extend(["-b:a".to_string(), format!("{}k", bitrate)]);
        } else if let Some(quality) = self.config.vbr_quality {
            args.extend(["-q:a".to_string(), quality.to_string()]);
        }

        // Standard sample rate and stereo for player compatibility
        args.extend([
            "-ar".to_string(),
            "44100".to_string(),
            "-ac".to_string(),
            "2".to_string(),
        ]);

        args.push(output_path.to_string_lossy().to_string());

        args
    }

    /// Parses ffprobe JSON output into MediaProbe.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaProbe, TranscodeError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: String,
            duration: Option<String>,
            size: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            bit_rate: Option<String>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| TranscodeError::ParseError {
                reason: format!("failed to parse ffprobe output: {}", e),
            })?;

        let duration_secs = probe
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let size_bytes = probe
            .format
            .size
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let audio_stream = probe.streams.iter().find(|s| s.codec_type == "audio");

        let format_name = probe
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("unknown");

        Ok(MediaProbe {
            path: path.to_path_buf(),
            size_bytes,
            duration_secs,
            format: format_name.to_string(),
            audio_codec: audio_stream.and_then(|s| s.codec_name.clone()),
            audio_bitrate_kbps: audio_stream
                .and_then(|s| s.bit_rate.as_ref())
                .and_then(|b| b.parse::<u32>().ok())
                .map(|b| b / 1000),
        })
    }

    /// Lowercased extension of a path.
    fn extension_of(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Publishes the raw input as-is, used for already-target inputs and
    /// for the fallback policy.
    async fn publish_raw(
        &self,
        input_path: &Path,
        output_path: &Path,
        ext: &str,
        started: Instant,
        warning: Option<String>,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        let artifact_path = output_path.with_extension(ext);
        fsops::move_file(input_path, &artifact_path).await?;

        let size_bytes = tokio::fs::metadata(&artifact_path).await?.len();

        Ok(TranscodeOutcome {
            artifact_path,
            mime_type: mime_for_extension(ext).to_string(),
            size_bytes,
            duration_ms: started.elapsed().as_millis() as u64,
            fallback: warning.is_some(),
            warning,
        })
    }

    /// Runs the ffmpeg encode.
    async fn run_encode(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<(), TranscodeError> {
        let args = self.build_args(input_path, output_path);

        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result.map_err(TranscodeError::Io)?,
            Err(_) => {
                return Err(TranscodeError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(TranscodeError::encode_failed(
                format!("ffmpeg exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        // Verify output exists and is non-empty
        match tokio::fs::metadata(output_path).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(TranscodeError::encode_failed(
                "output file not created",
                None,
            )),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaProbe, TranscodeError> {
        if !path.exists() {
            return Err(TranscodeError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TranscodeError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn transcode(&self, req: TranscodeRequest) -> Result<TranscodeOutcome, TranscodeError> {
        let started = Instant::now();

        if !req.input_path.exists() {
            return Err(TranscodeError::InputNotFound {
                path: req.input_path.clone(),
            });
        }

        if let Some(parent) = req.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let input_ext = Self::extension_of(&req.input_path);
        let target_ext = self.config.target_format.extension();

        // Already in the target container: skip the encoder entirely.
        if input_ext.as_deref() == Some(target_ext) {
            info!(input = ?req.input_path, "input already in target format, skipping encode");
            return self
                .publish_raw(&req.input_path, &req.output_path, target_ext, started, None)
                .await;
        }

        match self.run_encode(&req.input_path, &req.output_path).await {
            Ok(()) => {
                let size_bytes = tokio::fs::metadata(&req.output_path).await?.len();

                // Raw input is consumed on success
                if let Err(e) = tokio::fs::remove_file(&req.input_path).await {
                    warn!(path = ?req.input_path, error = %e, "failed to remove raw input");
                }

                Ok(TranscodeOutcome {
                    artifact_path: req.output_path.clone(),
                    mime_type: self.config.target_format.mime_type().to_string(),
                    size_bytes,
                    duration_ms: started.elapsed().as_millis() as u64,
                    fallback: false,
                    warning: None,
                })
            }
            Err(encode_err) => {
                // Encoding is a quality normalization, not a correctness
                // requirement: a raw file that is already a usable audio
                // container becomes the artifact instead of failing the job.
                let usable = input_ext
                    .as_deref()
                    .is_some_and(|ext| self.config.is_fallback_format(ext));

                if !usable {
                    // A half-written output must not survive the failure.
                    let _ = tokio::fs::remove_file(&req.output_path).await;
                    return Err(encode_err);
                }

                let ext = input_ext.expect("usable input has an extension");
                let warning = format!(
                    "encoder failed ({}); published raw {} file unchanged",
                    encode_err, ext
                );
                warn!(input = ?req.input_path, %warning, "applying transcode fallback");

                let _ = tokio::fs::remove_file(&req.output_path).await;
                self.publish_raw(
                    &req.input_path,
                    &req.output_path,
                    &ext,
                    started,
                    Some(warning),
                )
                .await
            }
        }
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(TranscodeError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(TranscodeError::Io(e));
        }

        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(TranscodeError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(TranscodeError::Io(e));
        }

        Ok(())
    }
}
