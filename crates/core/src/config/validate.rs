use super::{types::Config, ConfigError};

/// Validate configuration beyond what serde enforces.
///
/// Collects every problem before failing, so a misconfigured deployment
/// reports all errors in one pass.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push("server.port cannot be 0".to_string());
    }

    for (name, value) in [
        ("feed.site_url", &config.feed.site_url),
        ("feed.media_base_url", &config.feed.media_base_url),
    ] {
        if value.is_empty() {
            errors.push(format!("{} is required", name));
        } else if !value.starts_with("http://") && !value.starts_with("https://") {
            errors.push(format!(
                "{} must start with http:// or https://, got: {}",
                name, value
            ));
        }
    }

    if config.feed.max_items == 0 {
        errors.push("feed.max_items must be at least 1".to_string());
    }

    if config.orchestrator.workers == 0 {
        errors.push("orchestrator.workers must be at least 1".to_string());
    }

    if config.orchestrator.queue_capacity == 0 {
        errors.push("orchestrator.queue_capacity must be at least 1".to_string());
    }

    if config.fetcher.timeout_secs == 0 {
        errors.push("fetcher.timeout_secs must be at least 1".to_string());
    }

    if config.transcoder.timeout_secs == 0 {
        errors.push("transcoder.timeout_secs must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
