//! Common test utilities for E2E testing with mocks.
//!
//! Builds the full server router in-process with mock tools injected, so
//! the pipeline can be exercised without yt-dlp or ffmpeg installed.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use podsmith_core::{
    load_config_from_str,
    testing::{MockFetcher, MockTranscoder},
    Config, FeedStore, Orchestrator,
};
use podsmith_server::api::create_router;
use podsmith_server::state::AppState;

/// Test fixture: in-process server with controllable mock tools.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock fetcher - configure downloads and failures
    pub fetcher: MockFetcher,
    /// Mock transcoder - configure encode behavior
    pub transcoder: MockTranscoder,
    /// The orchestrator behind the router
    pub orchestrator: Arc<Orchestrator>,
    /// Effective configuration
    pub config: Config,
    /// Temporary data directory
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let toml = format!(
            r#"
[feed]
site_url = "https://example.org/pod"
media_base_url = "https://example.org/pod/media"

[storage]
data_dir = "{}"
"#,
            temp_dir.path().display()
        );
        let config = load_config_from_str(&toml).expect("Failed to parse config");
        config
            .storage
            .ensure_directories()
            .await
            .expect("Failed to create storage dirs");

        let fetcher = MockFetcher::new();
        let transcoder = MockTranscoder::new();

        let feed = Arc::new(
            FeedStore::load(config.feed.clone(), &config.storage)
                .await
                .expect("Failed to load feed store"),
        );

        let orchestrator = Arc::new(Orchestrator::new(
            config.clone(),
            Arc::new(fetcher.clone()),
            Arc::new(transcoder.clone()),
            Arc::clone(&feed),
        ));
        orchestrator.start().await;

        let state = Arc::new(AppState::new(
            config.clone(),
            Arc::clone(&orchestrator),
            feed,
        ));
        let router = create_router(state);

        Self {
            router,
            fetcher,
            transcoder,
            orchestrator,
            config,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a GET request and return the raw body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a multipart upload with a `file` field plus optional text
    /// fields.
    pub async fn post_multipart(
        &self,
        path: &str,
        file_name: &str,
        file_contents: &[u8],
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let boundary = "podsmith-test-boundary";
        let mut body: Vec<u8> = Vec::new();

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(file_contents);
        body.extend_from_slice(b"\r\n");

        for (name, value) in fields {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        Self::into_test_response(response).await
    }

    /// Polls a job's status endpoint until it reaches a terminal state.
    pub async fn wait_job_terminal(&self, job_id: &str) -> Value {
        for _ in 0..500 {
            let response = self.get(&format!("/api/v1/jobs/{}", job_id)).await;
            assert_eq!(response.status, StatusCode::OK);
            let state_type = response.body["state"]["type"]
                .as_str()
                .expect("state type present")
                .to_string();
            if matches!(state_type.as_str(), "completed" | "failed" | "cancelled") {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        Self::into_test_response(response).await
    }

    async fn into_test_response(response: axum::response::Response) -> TestResponse {
        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
