//! The persistent, ordered, deduplicated feed of published entries.
//!
//! `FeedStore` is the single owner of entry lifecycle: all mutations are
//! serialized through its write lock and persisted atomically, so a crash or
//! a concurrent reader can never observe a partially-written feed.

mod error;
mod rss;
mod store;
mod types;

pub use error::FeedError;
pub use rss::render_rss;
pub use store::FeedStore;
pub use types::{AddOutcome, Entry, FeedDocument};
