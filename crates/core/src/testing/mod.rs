//! Mock implementations for testing.
//!
//! These mocks let the orchestrator and server be exercised end-to-end
//! without yt-dlp or ffmpeg installed.

mod mock_fetcher;
mod mock_transcoder;

pub use mock_fetcher::MockFetcher;
pub use mock_transcoder::{MockTranscodeBehavior, MockTranscoder, RecordedTranscode};
