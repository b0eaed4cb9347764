//! Source locator normalization.
//!
//! Reduces the many superficially different locator shapes for the same
//! remote resource (watch links, short links, live/shorts/embed links, the
//! legacy `/v/` form, mobile domains) to a single canonical source id.
//! Query noise such as timestamp offsets or share trackers never influences
//! the result.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Minimum accepted id length.
const MIN_ID_LEN: usize = 6;

/// Maximum accepted id length.
const MAX_ID_LEN: usize = 64;

/// Hosts whose entire path is the bare id (short-link shape).
const SHORT_LINK_HOSTS: &[&str] = &["youtu.be"];

/// Errors produced while resolving a source locator.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The input is not a parseable http(s) URL.
    #[error("invalid source locator: {reason}")]
    InvalidLocator { reason: String },

    /// No recognizable id could be extracted from the locator.
    #[error("could not extract a source id from locator: {input}")]
    NoSourceId { input: String },

    /// An id was found but its format is not acceptable.
    #[error("invalid source id format: {id}")]
    InvalidId { id: String },
}

/// A normalized, query-noise-free identifier for a remote source.
///
/// Two locator strings that name the same underlying resource resolve to
/// equal `CanonicalSourceId` values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSourceId(String);

impl CanonicalSourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CanonicalSourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves an arbitrary locator string into a [`CanonicalSourceId`].
///
/// Pure function, no I/O. Returns [`ResolveError`] for anything that is not
/// a recognizable locator shape.
pub fn resolve(input: &str) -> Result<CanonicalSourceId, ResolveError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::InvalidLocator {
            reason: "empty input".to_string(),
        });
    }

    let parsed = Url::parse(trimmed).map_err(|e| ResolveError::InvalidLocator {
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ResolveError::InvalidLocator {
                reason: format!("unsupported scheme: {}", other),
            });
        }
    }

    if parsed.host_str().is_none() {
        return Err(ResolveError::InvalidLocator {
            reason: "locator has no host".to_string(),
        });
    }

    let id = extract_id(&parsed).ok_or_else(|| ResolveError::NoSourceId {
        input: trimmed.to_string(),
    })?;

    if !is_valid_id(&id) {
        return Err(ResolveError::InvalidId { id });
    }

    Ok(CanonicalSourceId(id))
}

/// Whether a string is an acceptable source id on its own.
pub fn is_valid_id(id: &str) -> bool {
    (MIN_ID_LEN..=MAX_ID_LEN).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Extracts the raw id from a parsed locator, trying each known shape.
fn extract_id(url: &Url) -> Option<String> {
    let path = url.path();

    // Watch links carry the id in the `v` query parameter.
    if path == "/watch" || path.starts_with("/watch/") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned());
    }

    // Path-prefixed shapes: live streams, shorts, embeds, the legacy form.
    for prefix in ["/live/", "/shorts/", "/embed/", "/v/"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return first_segment(rest);
        }
    }

    // Short links: the path is the bare id.
    let host = url.host_str().unwrap_or("");
    if SHORT_LINK_HOSTS.contains(&host) {
        return first_segment(path.trim_start_matches('/'));
    }

    None
}

/// Returns the first path segment, dropping anything after a separator.
fn first_segment(rest: &str) -> Option<String> {
    let seg = rest.split('/').next().unwrap_or("");
    if seg.is_empty() {
        None
    } else {
        Some(seg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_link() {
        let id = resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_all_shapes_reduce_to_same_id() {
        let locators = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
        ];

        for locator in locators {
            let id = resolve(locator).unwrap();
            assert_eq!(id.as_str(), "dQw4w9WgXcQ", "locator: {}", locator);
        }
    }

    #[test]
    fn test_noise_query_params_ignored() {
        let plain = resolve("https://example.com/watch?v=abc123").unwrap();
        let with_timestamp = resolve("https://example.com/watch?v=abc123&t=15s").unwrap();
        let with_tracker =
            resolve("https://www.youtube.com/live/NX7p0SAbk_M?si=hMBeoc95sefBitEU").unwrap();

        assert_eq!(plain, with_timestamp);
        assert_eq!(plain.as_str(), "abc123");
        assert_eq!(with_tracker.as_str(), "NX7p0SAbk_M");
    }

    #[test]
    fn test_playlist_param_ignored() {
        let id = resolve(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG",
        )
        .unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_short_link() {
        let id = resolve("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_rejects_non_url_input() {
        assert!(matches!(
            resolve("not a url"),
            Err(ResolveError::InvalidLocator { .. })
        ));
        assert!(matches!(resolve(""), Err(ResolveError::InvalidLocator { .. })));
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        assert!(matches!(
            resolve("ftp://example.com/watch?v=dQw4w9WgXcQ"),
            Err(ResolveError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn test_rejects_watch_without_id() {
        assert!(matches!(
            resolve("https://www.youtube.com/watch?t=15s"),
            Err(ResolveError::NoSourceId { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_id_charset() {
        assert!(matches!(
            resolve("https://www.youtube.com/watch?v=bad%20id%21%21"),
            Err(ResolveError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_rejects_too_short_id() {
        assert!(matches!(
            resolve("https://youtu.be/abc"),
            Err(ResolveError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_bare_path_only_on_short_link_hosts() {
        assert!(matches!(
            resolve("https://example.com/some-page"),
            Err(ResolveError::NoSourceId { .. })
        ));
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("dQw4w9WgXcQ"));
        assert!(is_valid_id("abc123"));
        assert!(is_valid_id("abc123XYZ-_"));
        assert!(!is_valid_id("abc"));
        assert!(!is_valid_id("has space"));
        assert!(!is_valid_id(&"x".repeat(65)));
    }
}
