//! Transcoding of acquired media into the feed's canonical audio format.
//!
//! The `Transcoder` trait isolates the pipeline from the external encoder;
//! `FfmpegTranscoder` drives ffmpeg/ffprobe subprocesses and owns the
//! fallback policy for already-compatible inputs.

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::TranscodeError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
pub use types::{mime_for_extension, AudioFormat, MediaProbe, TranscodeOutcome, TranscodeRequest};
