//! Feed store persistence tests.
//!
//! These exercise the store's central invariants: id uniqueness, duplicate
//! no-ops, the presentation cap, atomic persistence, and recovery.

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use podsmith_core::{Entry, FeedConfig, FeedError, FeedStore, StorageConfig};

fn feed_config(max_items: usize) -> FeedConfig {
    FeedConfig {
        site_url: "https://example.org/pod".to_string(),
        media_base_url: "https://example.org/pod/media".to_string(),
        title: "Test Cast".to_string(),
        description: "A test feed".to_string(),
        author: "Tester".to_string(),
        language: "en".to_string(),
        category: "Technology".to_string(),
        max_items,
    }
}

fn storage(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        data_dir: dir.path().to_path_buf(),
    }
}

fn entry(id: &str, minutes_ago: i64) -> Entry {
    Entry {
        id: id.to_string(),
        title: format!("Episode {}", id),
        description: "desc".to_string(),
        duration_secs: Some(120),
        media_url: format!("https://example.org/pod/media/{}.mp3", id),
        mime_type: "audio/mpeg".to_string(),
        file_size_bytes: 1024,
        published_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
            - Duration::minutes(minutes_ago),
        source_link: None,
    }
}

async fn new_store(dir: &TempDir, max_items: usize) -> FeedStore {
    FeedStore::load(feed_config(max_items), &storage(dir))
        .await
        .expect("store loads")
}

#[tokio::test]
async fn test_add_and_list_descending_order() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir, 50).await;

    store.add_entry(entry("oldest", 30)).await.unwrap();
    store.add_entry(entry("newest", 0)).await.unwrap();
    store.add_entry(entry("middle", 15)).await.unwrap();

    let listed = store.list_entries().await;
    let ids: Vec<&str> = listed.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["newest", "middle", "oldest"]);
}

#[tokio::test]
async fn test_duplicate_add_is_noop_byte_identical() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir, 50).await;

    let outcome = store.add_entry(entry("abc123", 0)).await.unwrap();
    assert!(outcome.added);
    assert!(!outcome.duplicate);

    let doc_path = storage(&dir).feed_document_path();
    let rss_path = storage(&dir).rss_path();
    let doc_before = tokio::fs::read(&doc_path).await.unwrap();
    let rss_before = tokio::fs::read(&rss_path).await.unwrap();
    let revision_before = store.revision().await;

    // Same id, different payload: still a no-op.
    let mut again = entry("abc123", 5);
    again.title = "Completely different".to_string();
    let outcome = store.add_entry(again).await.unwrap();
    assert!(!outcome.added);
    assert!(outcome.duplicate);

    assert_eq!(store.entry_count().await, 1);
    assert_eq!(store.revision().await, revision_before);
    assert_eq!(tokio::fs::read(&doc_path).await.unwrap(), doc_before);
    assert_eq!(tokio::fs::read(&rss_path).await.unwrap(), rss_before);
}

#[tokio::test]
async fn test_presentation_cap_keeps_most_recent() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir, 3).await;

    for (id, age) in [("e1", 40), ("e2", 30), ("e3", 20), ("e4", 10)] {
        let outcome = store.add_entry(entry(id, age)).await.unwrap();
        assert!(outcome.added);
    }

    // The cap bounds presentation, not storage.
    assert_eq!(store.entry_count().await, 4);

    let listed = store.list_entries().await;
    let ids: Vec<&str> = listed.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e4", "e3", "e2"]);

    // The rendered feed honors the same cap.
    let rss = tokio::fs::read_to_string(storage(&dir).rss_path())
        .await
        .unwrap();
    assert_eq!(rss.matches("<item>").count(), 3);
    assert!(!rss.contains(">e1<"));
}

#[tokio::test]
async fn test_delete_entry_removes_artifact() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir, 50).await;
    let media_dir = storage(&dir).media_dir();
    tokio::fs::create_dir_all(&media_dir).await.unwrap();

    let artifact = media_dir.join("abc123.mp3");
    tokio::fs::write(&artifact, b"audio").await.unwrap();

    store.add_entry(entry("abc123", 0)).await.unwrap();
    assert!(store.delete_entry("abc123").await.unwrap());

    assert!(store.list_entries().await.is_empty());
    assert!(!artifact.exists());

    // Deleting again is not an error.
    assert!(!store.delete_entry("abc123").await.unwrap());
}

#[tokio::test]
async fn test_load_absent_document_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir, 50).await;
    assert_eq!(store.entry_count().await, 0);
    assert_eq!(store.revision().await, 0);
}

#[tokio::test]
async fn test_load_corrupt_document_fails_fast() {
    let dir = TempDir::new().unwrap();
    let doc_path = storage(&dir).feed_document_path();
    tokio::fs::write(&doc_path, b"{ this is not json")
        .await
        .unwrap();

    let result = FeedStore::load(feed_config(50), &storage(&dir)).await;
    assert!(matches!(result, Err(FeedError::Corrupt { .. })));
}

#[tokio::test]
async fn test_interrupted_persist_leaves_document_intact() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir, 50).await;
    store.add_entry(entry("abc123", 0)).await.unwrap();
    drop(store);

    // Simulate a crash between temp-file write and rename: a truncated
    // sibling temp file exists, the real document is untouched.
    let doc_path = storage(&dir).feed_document_path();
    let tmp_path = doc_path.with_file_name("feed.json.tmp");
    tokio::fs::write(&tmp_path, b"{\"version\":1,\"rev")
        .await
        .unwrap();

    let store = FeedStore::load(feed_config(50), &storage(&dir))
        .await
        .expect("previous document still parses");
    assert_eq!(store.entry_count().await, 1);
    let listed = store.list_entries().await;
    assert_eq!(listed[0].id, "abc123");
}

#[tokio::test]
async fn test_reload_roundtrip() {
    let dir = TempDir::new().unwrap();
    {
        let store = new_store(&dir, 50).await;
        store.add_entry(entry("first0", 10)).await.unwrap();
        store.add_entry(entry("second", 0)).await.unwrap();
    }

    let store = new_store(&dir, 50).await;
    assert_eq!(store.entry_count().await, 2);
    assert_eq!(store.revision().await, 2);
    let listed = store.list_entries().await;
    assert_eq!(listed[0].id, "second");
    assert_eq!(listed[1].id, "first0");
}

#[tokio::test]
async fn test_persisted_rss_carries_enclosures() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir, 50).await;
    store.add_entry(entry("abc123", 0)).await.unwrap();

    let rss = tokio::fs::read_to_string(storage(&dir).rss_path())
        .await
        .unwrap();
    assert!(rss.contains("<guid isPermaLink=\"false\">abc123</guid>"));
    assert!(rss.contains(
        "<enclosure url=\"https://example.org/pod/media/abc123.mp3\" length=\"1024\" type=\"audio/mpeg\"/>"
    ));
}

#[tokio::test]
async fn test_concurrent_reads_during_writes() {
    use std::sync::Arc;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(new_store(&dir, 50).await);

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..20 {
                store
                    .add_entry(entry(&format!("entry{:02}", i), i))
                    .await
                    .unwrap();
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..50 {
                // Every snapshot is internally consistent: unique ids,
                // descending order.
                let listed = store.list_entries().await;
                let mut ids: Vec<_> = listed.iter().map(|e| e.id.clone()).collect();
                let len_before = ids.len();
                ids.dedup();
                assert_eq!(ids.len(), len_before);
                for pair in listed.windows(2) {
                    assert!(pair[0].published_at >= pair[1].published_at);
                }
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(store.entry_count().await, 20);
}
