//! End-to-end tests with mocked external tools.
//!
//! These run the full server stack in-process: submit over HTTP, poll the
//! status endpoint, read the feed endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use std::time::Duration;

use common::TestFixture;
use podsmith_core::testing::MockTranscodeBehavior;

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["feed"]["site_url"], "https://example.org/pod");
    assert_eq!(response.body["orchestrator"]["workers"], 2);
}

#[tokio::test]
async fn test_status_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/status").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["running"], true);
    assert_eq!(response.body["queue_capacity"], 64);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    let (status, text) = fixture.get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("podsmith_"));
}

// =============================================================================
// Job Submission
// =============================================================================

#[tokio::test]
async fn test_submit_invalid_url_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/jobs", json!({ "url": "not a url" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].as_str().unwrap().contains("invalid"));

    // Rejected submissions never create a job.
    let status = fixture.get("/api/v1/status").await;
    assert_eq!(status.body["jobs"], 0);
}

#[tokio::test]
async fn test_submit_and_poll_to_completion() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/v1/jobs",
            json!({ "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=15s" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    let job_id = response.body["job_id"].as_str().unwrap().to_string();
    assert_eq!(response.body["state"]["type"], "pending");

    let done = fixture.wait_job_terminal(&job_id).await;
    assert_eq!(done["state"]["type"], "completed");
    assert_eq!(done["result_entry_id"], "dQw4w9WgXcQ");
    assert_eq!(done["duplicate"], false);
    assert_eq!(done["message"], "Published");

    let entries = fixture.get("/api/v1/entries").await;
    assert_eq!(entries.status, StatusCode::OK);
    assert_eq!(entries.body["count"], 1);
    let entry = &entries.body["entries"][0];
    assert_eq!(entry["id"], "dQw4w9WgXcQ");
    assert_eq!(entry["mime_type"], "audio/mpeg");
    assert!(entry["media_url"]
        .as_str()
        .unwrap()
        .ends_with("/dQw4w9WgXcQ.mp3"));
}

#[tokio::test]
async fn test_duplicate_submission_reports_duplicate() {
    let fixture = TestFixture::new().await;

    let first = fixture
        .post("/api/v1/jobs", json!({ "url": "https://youtu.be/dQw4w9WgXcQ" }))
        .await;
    let first_done = fixture
        .wait_job_terminal(first.body["job_id"].as_str().unwrap())
        .await;
    assert_eq!(first_done["duplicate"], false);

    let second = fixture
        .post(
            "/api/v1/jobs",
            json!({ "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ" }),
        )
        .await;
    let second_done = fixture
        .wait_job_terminal(second.body["job_id"].as_str().unwrap())
        .await;
    assert_eq!(second_done["state"]["type"], "completed");
    assert_eq!(second_done["duplicate"], true);
    assert_eq!(second_done["message"], "Already in feed");

    let entries = fixture.get("/api/v1/entries").await;
    assert_eq!(entries.body["count"], 1);
}

#[tokio::test]
async fn test_unknown_job_status_is_404() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/jobs/no-such-job").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_job_exposes_category() {
    let fixture = TestFixture::new().await;
    fixture
        .fetcher
        .set_next_error(podsmith_core::FetchError::extraction_failed(
            "access denied",
            None,
        ))
        .await;

    let response = fixture
        .post("/api/v1/jobs", json!({ "url": "https://youtu.be/dQw4w9WgXcQ" }))
        .await;
    let done = fixture
        .wait_job_terminal(response.body["job_id"].as_str().unwrap())
        .await;

    assert_eq!(done["state"]["type"], "failed");
    assert_eq!(done["error"]["category"], "acquisition_failed");
    assert!(done["error"]["message"]
        .as_str()
        .unwrap()
        .contains("access denied"));
}

#[tokio::test]
async fn test_fallback_surfaces_warning() {
    let fixture = TestFixture::new().await;
    fixture.fetcher.set_media_extension("m4a").await;
    fixture
        .transcoder
        .set_behavior(MockTranscodeBehavior::Fallback)
        .await;

    let response = fixture
        .post("/api/v1/jobs", json!({ "url": "https://youtu.be/dQw4w9WgXcQ" }))
        .await;
    let done = fixture
        .wait_job_terminal(response.body["job_id"].as_str().unwrap())
        .await;

    assert_eq!(done["state"]["type"], "completed");
    assert!(done["state"]["warning"]
        .as_str()
        .unwrap()
        .contains("encoder failed"));

    let entries = fixture.get("/api/v1/entries").await;
    assert_eq!(entries.body["entries"][0]["mime_type"], "audio/mp4");
}

#[tokio::test]
async fn test_cancel_job_over_http() {
    let fixture = TestFixture::new().await;
    fixture
        .fetcher
        .set_fetch_duration(Duration::from_secs(10))
        .await;

    let response = fixture
        .post("/api/v1/jobs", json!({ "url": "https://youtu.be/dQw4w9WgXcQ" }))
        .await;
    let job_id = response.body["job_id"].as_str().unwrap().to_string();

    // Let the worker pick it up.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let cancel = fixture.delete(&format!("/api/v1/jobs/{}", job_id)).await;
    assert_eq!(cancel.status, StatusCode::OK);

    let done = fixture.wait_job_terminal(&job_id).await;
    assert_eq!(done["state"]["type"], "cancelled");

    // Cancelling a terminal job conflicts.
    let again = fixture.delete(&format!("/api/v1/jobs/{}", job_id)).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

// =============================================================================
// Uploads
// =============================================================================

#[tokio::test]
async fn test_upload_flow() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_multipart(
            "/api/v1/jobs/upload",
            "My Talk.m4a",
            b"uploaded audio bytes",
            &[("title", "Conference Talk")],
        )
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    let job_id = response.body["job_id"].as_str().unwrap().to_string();

    let done = fixture.wait_job_terminal(&job_id).await;
    assert_eq!(done["state"]["type"], "completed");
    let entry_id = done["result_entry_id"].as_str().unwrap();
    assert_eq!(entry_id.len(), 16);

    let entries = fixture.get("/api/v1/entries").await;
    assert_eq!(entries.body["count"], 1);
    assert_eq!(entries.body["entries"][0]["title"], "Conference Talk");
}

#[tokio::test]
async fn test_upload_empty_file_rejected() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post_multipart("/api/v1/jobs/upload", "empty.m4a", b"", &[])
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let status = fixture.get("/api/v1/status").await;
    assert_eq!(status.body["jobs"], 0);
}

// =============================================================================
// Entries & Feed
// =============================================================================

#[tokio::test]
async fn test_delete_entry_roundtrip() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/jobs", json!({ "url": "https://youtu.be/dQw4w9WgXcQ" }))
        .await;
    fixture
        .wait_job_terminal(response.body["job_id"].as_str().unwrap())
        .await;

    let artifact = fixture.config.storage.media_dir().join("dQw4w9WgXcQ.mp3");
    assert!(artifact.exists());

    let deleted = fixture.delete("/api/v1/entries/dQw4w9WgXcQ").await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["found"], true);
    assert!(!artifact.exists());

    let entries = fixture.get("/api/v1/entries").await;
    assert_eq!(entries.body["count"], 0);

    // Deleting again reports not-found without failing.
    let again = fixture.delete("/api/v1/entries/dQw4w9WgXcQ").await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["found"], false);
}

#[tokio::test]
async fn test_feed_xml_served_from_storage() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/jobs", json!({ "url": "https://youtu.be/dQw4w9WgXcQ" }))
        .await;
    fixture
        .wait_job_terminal(response.body["job_id"].as_str().unwrap())
        .await;

    let (status, xml) = fixture.get_text("/feed.xml").await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("<rss version=\"2.0\""));
    assert!(xml.contains("<guid isPermaLink=\"false\">dQw4w9WgXcQ</guid>"));
    assert!(xml.contains("enclosure"));
}

#[tokio::test]
async fn test_media_artifact_served() {
    let fixture = TestFixture::new().await;
    fixture
        .fetcher
        .set_media_contents(b"the encoded audio".to_vec())
        .await;

    let response = fixture
        .post("/api/v1/jobs", json!({ "url": "https://youtu.be/dQw4w9WgXcQ" }))
        .await;
    fixture
        .wait_job_terminal(response.body["job_id"].as_str().unwrap())
        .await;

    let (status, body) = fixture.get_text("/media/dQw4w9WgXcQ.mp3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "the encoded audio");
}
