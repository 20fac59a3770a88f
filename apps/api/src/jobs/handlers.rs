//! Axum route handlers for the job endpoints.

use axum::{
    extract::{Multipart, Query, State},
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::admission::{admit_cv, admit_text_job, check_cv_file, require_fields, CvUpload};
use super::dispatch::JobEvent;
use super::executor::{max_attempts, RunOutcome};
use super::{Admission, NewJob};
use crate::auth::Caller;
use crate::errors::AppError;
use crate::formatting::cv::{format_report, CvReport};
use crate::formatting::roadmap;
use crate::models::job::{JobKind, JobPayload, JobRecord, JobResult, JobStatus};
use crate::pdf::extract_cv_text;
use crate::state::AppState;

pub const EXECUTOR_SECRET_HEADER: &str = "x-executor-secret";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoadmapRequest {
    pub user_id: Option<String>,
    pub user_input: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCoverLetterRequest {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub job_description: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQuery {
    pub id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterResponse {
    pub id: Uuid,
    pub status: JobStatus,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvAnalysisView {
    pub id: Uuid,
    pub status: JobStatus,
    pub file_name: String,
    pub file_url: Option<String>,
    pub score: Option<i32>,
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CvReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CvAnalysisView {
    fn from_record(job: JobRecord, with_report: bool) -> Self {
        let file_name = match &job.payload {
            JobPayload::CvAnalysis { file_name, .. } => file_name.clone(),
            _ => String::new(),
        };
        let analysis = match &job.result {
            Some(JobResult::CvAnalysis { analysis, .. }) => Some(analysis.clone()),
            _ => None,
        };
        let report = analysis
            .as_deref()
            .filter(|_| with_report)
            .map(format_report);
        Self {
            id: job.id,
            status: job.status,
            file_name,
            file_url: job.file_url.clone(),
            score: job.score(),
            analysis,
            report,
            error: job.error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Zero-based delivery attempt reported by the executor.
#[derive(Debug, Default, Deserialize)]
pub struct ExecutorContext {
    #[serde(default)]
    pub attempt: u32,
}

#[derive(Debug, Deserialize)]
pub struct ExecutorCallback {
    pub event: JobEvent,
    #[serde(default)]
    pub ctx: ExecutorContext,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn admitted(id_field: &str, admission: &Admission, message: &str) -> Json<Value> {
    let mut body = json!({ "success": true, "message": message });
    body[id_field] = json!(admission.job.id);
    if let Some(remaining) = admission.credits.remaining() {
        body["remainingCredits"] = json!(remaining);
    }
    Json(body)
}

fn require_id(id: Option<&str>, what: &str) -> Result<String, AppError> {
    id.map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(format!("Missing {what} id")))
}

/// Loads a job of `kind`. Unparseable ids, other kinds and, for verified
/// callers, other users' jobs all read as absent.
async fn find_job(
    state: &AppState,
    caller: &Caller,
    id: &str,
    kind: JobKind,
) -> Result<Option<JobRecord>, AppError> {
    let Ok(id) = Uuid::parse_str(id) else {
        return Ok(None);
    };
    let job = state.jobs.get(id).await?;
    Ok(job.filter(|job| {
        job.kind == kind
            && match caller {
                Caller::Verified(sub) => &job.user_id == sub,
                Caller::Anonymous => true,
            }
    }))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid upload: {e}"))
}

// ────────────────────────────────────────────────────────────────────────────
// Roadmap
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/roadmap
pub async fn handle_create_roadmap(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateRoadmapRequest>,
) -> Result<Json<Value>, AppError> {
    require_fields(&[
        ("userInput", request.user_input.as_deref()),
        ("userEmail", request.user_email.as_deref()),
    ])?;
    let user_id = caller.resolve(request.user_id.as_deref())?;

    let new_job = NewJob {
        user_id,
        payload: JobPayload::Roadmap {
            user_input: request.user_input.unwrap_or_default(),
            user_email: request.user_email.unwrap_or_default(),
        },
    };
    let admission =
        admit_text_job(state.jobs.as_ref(), state.dispatcher.as_ref(), new_job).await?;

    Ok(admitted(
        "roadmapId",
        &admission,
        "Roadmap generation started",
    ))
}

/// GET /api/roadmap?id=
///
/// Unknown ids answer `processing` instead of 404; clients keep polling until
/// their own timeout.
pub async fn handle_get_roadmap(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<JobQuery>,
) -> Result<Json<Value>, AppError> {
    let id = require_id(query.id.as_deref(), "roadmap")?;

    let Some(job) = find_job(&state, &caller, &id, JobKind::Roadmap).await? else {
        return Ok(Json(json!({ "status": JobStatus::Processing })));
    };

    let roadmap_data = match &job.result {
        Some(JobResult::Roadmap { roadmap_data }) => Some(roadmap_data.clone()),
        _ => None,
    };
    let mut body = json!({
        "status": job.status,
        "roadmapData": roadmap_data,
    });
    if let Some(text) = &roadmap_data {
        body["roadmap"] = json!(roadmap::parse(text));
    }
    if let Some(error) = &job.error {
        body["error"] = json!(error);
    }
    Ok(Json(body))
}

// ────────────────────────────────────────────────────────────────────────────
// Cover letter
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/cover-letter
pub async fn handle_create_cover_letter(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateCoverLetterRequest>,
) -> Result<Json<Value>, AppError> {
    require_fields(&[
        ("userEmail", request.user_email.as_deref()),
        ("jobDescription", request.job_description.as_deref()),
    ])?;
    let user_id = caller.resolve(request.user_id.as_deref())?;

    let new_job = NewJob {
        user_id,
        payload: JobPayload::CoverLetter {
            job_description: request.job_description.unwrap_or_default(),
            user_email: request.user_email.unwrap_or_default(),
            user_name: request.user_name.filter(|n| !n.trim().is_empty()),
        },
    };
    let admission =
        admit_text_job(state.jobs.as_ref(), state.dispatcher.as_ref(), new_job).await?;

    Ok(admitted(
        "coverLetterId",
        &admission,
        "Cover letter generation started",
    ))
}

/// GET /api/cover-letter?id=
pub async fn handle_get_cover_letter(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<JobQuery>,
) -> Result<Json<CoverLetterResponse>, AppError> {
    let id = require_id(query.id.as_deref(), "cover letter")?;

    let job = find_job(&state, &caller, &id, JobKind::CoverLetter)
        .await?
        .ok_or_else(|| AppError::NotFound("Cover letter not found".to_string()))?;

    let content = match job.result {
        Some(JobResult::CoverLetter { content }) => Some(content),
        _ => None,
    };
    Ok(Json(CoverLetterResponse {
        id: job.id,
        status: job.status,
        content,
        error: job.error,
        updated_at: job.updated_at,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// CV analysis
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/cv-analyze
///
/// Multipart form: required `cv` PDF, plus `userId` when auth is disabled.
/// Every check runs before a credit is spent.
pub async fn handle_create_cv_analysis(
    State(state): State<AppState>,
    caller: Caller,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut claimed_user: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "cv" => {
                let file_name = field.file_name().unwrap_or("cv.pdf").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, data));
            }
            "userId" => {
                claimed_user = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let user_id = caller.resolve(claimed_user.as_deref())?;
    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("No CV file uploaded".to_string()))?;
    check_cv_file(content_type.as_deref(), bytes.len())?;

    let pdf = bytes.clone();
    let text = tokio::task::spawn_blocking(move || extract_cv_text(&pdf))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))??;

    let upload = CvUpload {
        user_id,
        file_name,
        bytes,
        text,
    };
    let admission = admit_cv(
        state.jobs.as_ref(),
        state.files.as_ref(),
        state.dispatcher.as_ref(),
        upload,
    )
    .await?;

    Ok(admitted(
        "recordId",
        &admission,
        "CV uploaded. Analysis started",
    ))
}

/// GET /api/cv-analyze[?id=]
///
/// With `id`: one of the caller's analyses including the sectioned report.
/// Without: all of the caller's analyses, newest first.
pub async fn handle_get_cv_analysis(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<JobQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller.resolve(query.user_id.as_deref())?;

    match query.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => {
            let job = find_job(&state, &caller, id, JobKind::CvAnalysis)
                .await?
                .filter(|job| job.user_id == user_id)
                .ok_or_else(|| AppError::NotFound("Analysis not found".to_string()))?;
            Ok(Json(json!({
                "success": true,
                "analysis": CvAnalysisView::from_record(job, true),
            })))
        }
        None => {
            let analyses: Vec<CvAnalysisView> = state
                .jobs
                .list_for_user(&user_id, JobKind::CvAnalysis)
                .await?
                .into_iter()
                .map(|job| CvAnalysisView::from_record(job, false))
                .collect();
            Ok(Json(json!({ "success": true, "analyses": analyses })))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Executor callback
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/inngest
///
/// Called by the external executor for each delivery of a job event. An error
/// response asks it to retry; the last attempt marks the job failed.
pub async fn handle_executor_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(callback): Json<ExecutorCallback>,
) -> Result<Json<Value>, AppError> {
    let expected = state.executor_secret.as_deref().ok_or(AppError::Forbidden)?;
    let provided = headers
        .get(EXECUTOR_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        return Err(AppError::Unauthorized(
            "Invalid executor secret".to_string(),
        ));
    }

    let event = callback.event;
    let attempt = callback.ctx.attempt;
    info!(
        job_id = %event.job_id(),
        event = event.name(),
        attempt,
        "Executor callback received"
    );

    let outcome = state
        .executor
        .handle_attempt(&event, attempt, max_attempts(event.kind()))
        .await?;

    let outcome = match outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Skipped => "skipped",
    };
    Ok(Json(json!({ "success": true, "outcome": outcome })))
}
