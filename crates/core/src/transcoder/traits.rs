//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use std::path::Path;

use super::error::TranscodeError;
use super::types::{MediaProbe, TranscodeOutcome, TranscodeRequest};

/// A transcoder producing the feed's canonical audio artifact.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Probes a media file.
    async fn probe(&self, path: &Path) -> Result<MediaProbe, TranscodeError>;

    /// Converts the raw input into the canonical artifact.
    ///
    /// On success the raw input file is consumed. An encoder failure with a
    /// directly-usable audio input is absorbed by the fallback policy and
    /// reported through [`TranscodeOutcome::fallback`]; only an unusable
    /// input propagates the error.
    async fn transcode(&self, req: TranscodeRequest) -> Result<TranscodeOutcome, TranscodeError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscodeError>;
}
