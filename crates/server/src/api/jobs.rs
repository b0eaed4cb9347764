//! Job API handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use podsmith_core::{
    CancelError, FetchProgress, Job, JobState, SourceReference, SubmitError, SubmitRequest,
};

use super::ErrorBody;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a remote source.
#[derive(Debug, Deserialize)]
pub struct SubmitJobBody {
    /// The source locator.
    pub url: String,
    /// Optional title override.
    pub title: Option<String>,
    /// Optional description override.
    pub description: Option<String>,
}

/// Response for a job submission.
#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub state: JobState,
}

/// Failure detail in a status response.
#[derive(Debug, Serialize)]
pub struct JobErrorBody {
    pub category: String,
    pub message: String,
}

/// Response for a status query.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub id: String,
    pub state: JobState,
    /// Human-readable one-liner for the current state.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<FetchProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobErrorBody>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        let message = job.state.message();

        let progress = match &job.state {
            JobState::Acquiring { progress } => progress.clone(),
            _ => None,
        };

        let (result_entry_id, duplicate) = match &job.state {
            JobState::Completed {
                entry_id,
                duplicate,
                ..
            } => (Some(entry_id.clone()), Some(*duplicate)),
            _ => (None, None),
        };

        let error = match &job.state {
            JobState::Failed { category, message } => Some(JobErrorBody {
                category: category.as_str().to_string(),
                message: message.clone(),
            }),
            _ => None,
        };

        Self {
            id: job.id,
            state: job.state,
            message,
            progress,
            result_entry_id,
            duplicate,
            error,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a remote source for ingestion.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitJobBody>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), (StatusCode, Json<ErrorBody>)> {
    let request = SubmitRequest {
        source: SourceReference::RemoteLocator { url: body.url },
        title: body.title.filter(|t| !t.is_empty()),
        description: body.description.filter(|d| !d.is_empty()),
    };

    match state.orchestrator().submit(request).await {
        Ok(job) => Ok((
            StatusCode::ACCEPTED,
            Json(SubmitJobResponse {
                job_id: job.id,
                state: job.state,
            }),
        )),
        Err(e) => Err(submit_error_response(e)),
    }
}

/// Submit uploaded bytes for ingestion (multipart: `file`, optional `title`
/// and `description` fields).
pub async fn upload_job(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitJobResponse>), (StatusCode, Json<ErrorBody>)> {
    let mut file: Option<(String, axum::body::Bytes)> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorBody::new(format!("invalid multipart body: {}", e))),
                ));
            }
        };

        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                let name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("upload.bin")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorBody::new(format!("failed to read upload: {}", e))),
                    )
                })?;
                file = Some((name, bytes));
            }
            Some("title") => {
                title = field.text().await.ok().filter(|t| !t.is_empty());
            }
            Some("description") => {
                description = field.text().await.ok().filter(|d| !d.is_empty());
            }
            _ => {}
        }
    }

    let Some((original_name, bytes)) = file else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("missing 'file' field")),
        ));
    };

    if bytes.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("uploaded file is empty")),
        ));
    }

    // Land the bytes in the intake dir; the orchestrator owns them from
    // submission onward.
    let intake = state
        .config()
        .storage
        .upload_dir()
        .join(format!("{}-{}", Uuid::new_v4(), sanitize_file_name(&original_name)));

    if let Err(e) = tokio::fs::write(&intake, &bytes).await {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(format!("failed to store upload: {}", e))),
        ));
    }

    let request = SubmitRequest {
        source: SourceReference::UploadedBytes {
            path: intake.clone(),
            original_name,
        },
        title,
        description,
    };

    match state.orchestrator().submit(request).await {
        Ok(job) => Ok((
            StatusCode::ACCEPTED,
            Json(SubmitJobResponse {
                job_id: job.id,
                state: job.state,
            }),
        )),
        Err(e) => {
            // The job never existed; don't leak the intake file.
            let _ = tokio::fs::remove_file(&intake).await;
            Err(submit_error_response(e))
        }
    }
}

/// Get job status by id.
pub async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, (StatusCode, Json<ErrorBody>)> {
    match state.orchestrator().get_job(&id).await {
        Some(job) => Ok(Json(JobStatusResponse::from(job))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new(format!("Job not found: {}", id))),
        )),
    }
}

/// Cancel a job (DELETE endpoint).
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, (StatusCode, Json<ErrorBody>)> {
    match state.orchestrator().cancel(&id).await {
        Ok(()) => {
            let job = state.orchestrator().get_job(&id).await.ok_or_else(|| {
                (
                    StatusCode::NOT_FOUND,
                    Json(ErrorBody::new(format!("Job not found: {}", id))),
                )
            })?;
            Ok(Json(JobStatusResponse::from(job)))
        }
        Err(CancelError::NotFound(id)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new(format!("Job not found: {}", id))),
        )),
        Err(CancelError::AlreadyTerminal(id)) => Err((
            StatusCode::CONFLICT,
            Json(ErrorBody::new(format!(
                "Job already in terminal state: {}",
                id
            ))),
        )),
    }
}

fn submit_error_response(e: SubmitError) -> (StatusCode, Json<ErrorBody>) {
    let status = match e {
        SubmitError::InvalidSource(_) => StatusCode::BAD_REQUEST,
        SubmitError::Busy { .. } | SubmitError::NotRunning => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ErrorBody::new(e.to_string())))
}

/// Restricts uploaded file names to a safe charset.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My Talk.m4a"), "My_Talk.m4a");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("plain.mp3"), "plain.mp3");
    }
}
