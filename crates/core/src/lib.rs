pub mod config;
pub mod feed;
pub mod fetcher;
pub mod fsops;
pub mod ident;
pub mod jobs;
pub mod metrics;
pub mod resolver;
pub mod testing;
pub mod transcoder;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, FeedConfig,
    ServerConfig, StorageConfig,
};
pub use feed::{AddOutcome, Entry, FeedDocument, FeedError, FeedStore};
pub use fetcher::{
    FetchError, FetchProgress, FetchedMedia, FetcherConfig, MediaFetcher, MediaMetadata,
    YtdlpFetcher,
};
pub use jobs::{
    CancelError, ErrorCategory, Job, JobState, Orchestrator, OrchestratorConfig,
    OrchestratorStatus, SourceReference, SubmitError, SubmitRequest,
};
pub use resolver::{resolve, CanonicalSourceId, ResolveError};
pub use transcoder::{
    AudioFormat, FfmpegTranscoder, MediaProbe, TranscodeError, TranscodeOutcome, TranscodeRequest,
    Transcoder, TranscoderConfig,
};
