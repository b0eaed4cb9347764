use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podsmith_core::{
    load_config, validate_config, FeedStore, FfmpegTranscoder, MediaFetcher, Orchestrator,
    Transcoder, YtdlpFetcher,
};

use podsmith_server::api::create_router;
use podsmith_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PODSMITH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Feed: {}", config.feed.title);
    info!("Data dir: {:?}", config.storage.data_dir);

    config
        .storage
        .ensure_directories()
        .await
        .context("Failed to create storage directories")?;

    // Load the feed store; a corrupt document fails fast here.
    let feed = Arc::new(
        FeedStore::load(config.feed.clone(), &config.storage)
            .await
            .context("Failed to load feed store")?,
    );
    info!("Feed store loaded ({} entries)", feed.entry_count().await);

    // External tools
    let fetcher = Arc::new(YtdlpFetcher::new(config.fetcher.clone()));
    if let Err(e) = fetcher.validate().await {
        warn!("Fetcher validation failed ({}); remote jobs will fail", e);
    }

    let transcoder = Arc::new(FfmpegTranscoder::new(config.transcoder.clone()));
    if let Err(e) = transcoder.validate().await {
        warn!(
            "Transcoder validation failed ({}); jobs will rely on the fallback policy",
            e
        );
    }

    // Orchestrator
    let orchestrator = Arc::new(Orchestrator::new(
        config.clone(),
        fetcher,
        transcoder,
        Arc::clone(&feed),
    ));
    orchestrator.start().await;
    info!("Job orchestrator started");

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&orchestrator),
        feed,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    orchestrator.stop().await;
    info!("Orchestrator stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
