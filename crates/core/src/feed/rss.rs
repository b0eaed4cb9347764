//! RSS 2.0 rendering of the feed.
//!
//! This produces the externally-consumed document. Field layout follows the
//! podcast conventions: per-item guid (not a permalink), enclosure with url/
//! length/type, RFC 2822 pubDate and itunes duration tags.

use crate::config::FeedConfig;
use crate::fetcher::format_duration;

use super::types::Entry;

/// Generator string embedded in the channel.
const GENERATOR: &str = concat!("podsmith v", env!("CARGO_PKG_VERSION"));

/// Renders the feed as an RSS 2.0 document, newest entries first.
///
/// `entries` is expected pre-sorted and pre-capped by the store.
pub fn render_rss(config: &FeedConfig, entries: &[Entry]) -> String {
    let mut out = String::with_capacity(1024 + entries.len() * 512);

    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(concat!(
        "<rss version=\"2.0\"",
        " xmlns:itunes=\"http://www.itunes.com/dtds/podcast-1.0.dtd\"",
        " xmlns:atom=\"http://www.w3.org/2005/Atom\">\n"
    ));
    out.push_str("  <channel>\n");

    let site_url = config.site_url.trim_end_matches('/');

    push_tag(&mut out, 4, "title", &config.title);
    push_tag(&mut out, 4, "link", site_url);
    push_tag(&mut out, 4, "description", &config.description);
    push_tag(&mut out, 4, "language", &config.language);
    push_tag(&mut out, 4, "generator", GENERATOR);
    out.push_str(&format!(
        "    <atom:link href=\"{}/feed.xml\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape(site_url)
    ));
    push_tag(&mut out, 4, "itunes:author", &config.author);
    out.push_str(&format!(
        "    <itunes:category text=\"{}\"/>\n",
        escape(&config.category)
    ));
    out.push_str("    <itunes:explicit>no</itunes:explicit>\n");

    for entry in entries {
        render_item(&mut out, entry);
    }

    out.push_str("  </channel>\n");
    out.push_str("</rss>\n");

    out
}

fn render_item(out: &mut String, entry: &Entry) {
    out.push_str("    <item>\n");
    out.push_str(&format!(
        "      <guid isPermaLink=\"false\">{}</guid>\n",
        escape(&entry.id)
    ));
    push_tag(out, 6, "title", &entry.title);
    if let Some(ref link) = entry.source_link {
        push_tag(out, 6, "link", link);
    }
    push_tag(out, 6, "description", &entry.description);
    out.push_str(&format!(
        "      <enclosure url=\"{}\" length=\"{}\" type=\"{}\"/>\n",
        escape(&entry.media_url),
        entry.file_size_bytes,
        escape(&entry.mime_type)
    ));
    push_tag(out, 6, "pubDate", &entry.published_at.to_rfc2822());
    if let Some(duration) = entry.duration_secs {
        push_tag(out, 6, "itunes:duration", &format_duration(duration));
    }
    out.push_str("    </item>\n");
}

fn push_tag(out: &mut String, indent: usize, tag: &str, value: &str) {
    out.push_str(&" ".repeat(indent));
    out.push_str(&format!("<{}>{}</{}>\n", tag, escape(value), tag));
}

/// Escapes XML-reserved characters in text and attribute values.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
