//! Status Poller: client side of the job lifecycle.
//!
//! One request in flight at a time, fixed interval, bounded attempts. Used by
//! the `mentorly-poll` binary through `JobClient`.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::job::{JobKind, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn for_kind(kind: JobKind) -> Self {
        match kind {
            JobKind::CvAnalysis => Self {
                interval: Duration::from_secs(4),
                max_attempts: 40,
            },
            JobKind::Roadmap => Self {
                interval: Duration::from_secs(4),
                max_attempts: 45,
            },
            JobKind::CoverLetter => Self {
                interval: Duration::from_millis(2500),
                max_attempts: 60,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("job failed: {message}")]
    Failed { message: String },

    #[error("job did not finish after {attempts} polls")]
    TimedOut { attempts: u32 },

    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Status plus the raw response body of one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub body: Value,
}

impl JobSnapshot {
    pub fn from_body(body: Value) -> Result<Self, PollError> {
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| PollError::InvalidResponse("missing status".to_string()))?
            .parse::<JobStatus>()
            .map_err(PollError::InvalidResponse)?;
        Ok(Self { status, body })
    }
}

/// Waits `interval`, fetches, and repeats until the job is terminal or
/// `max_attempts` fetches have been made.
pub async fn poll_until_terminal<F, Fut>(
    config: &PollConfig,
    mut fetch: F,
) -> Result<JobSnapshot, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobSnapshot, PollError>>,
{
    for attempt in 1..=config.max_attempts {
        tokio::time::sleep(config.interval).await;
        let snapshot = fetch().await?;
        debug!(attempt, status = %snapshot.status, "Polled job");
        match snapshot.status {
            JobStatus::Completed => return Ok(snapshot),
            JobStatus::Failed => {
                let message = snapshot
                    .body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("Generation failed")
                    .to_string();
                return Err(PollError::Failed { message });
            }
            _ => {}
        }
    }
    Err(PollError::TimedOut {
        attempts: config.max_attempts,
    })
}

/// Id of a freshly admitted job and the balance left afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    pub id: Uuid,
    pub remaining_credits: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    roadmap_id: Option<Uuid>,
    cover_letter_id: Option<Uuid>,
    remaining_credits: Option<i64>,
}

/// HTTP client for the job endpoints.
pub struct JobClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl JobClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, PollError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn path(kind: JobKind) -> &'static str {
        match kind {
            JobKind::CvAnalysis => "/api/cv-analyze",
            JobKind::Roadmap => "/api/roadmap",
            JobKind::CoverLetter => "/api/cover-letter",
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, PollError> {
        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            let message = body
                .get("message")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            return Err(PollError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    async fn submit(&self, kind: JobKind, body: Value) -> Result<Submitted, PollError> {
        let url = format!("{}{}", self.base_url, Self::path(kind));
        let response = self.authorized(self.http.post(url)).json(&body).send().await?;
        let body = Self::read_json(response).await?;
        let parsed: SubmitResponse = serde_json::from_value(body)
            .map_err(|e| PollError::InvalidResponse(e.to_string()))?;
        let id = parsed
            .roadmap_id
            .or(parsed.cover_letter_id)
            .ok_or_else(|| PollError::InvalidResponse("missing job id".to_string()))?;
        Ok(Submitted {
            id,
            remaining_credits: parsed.remaining_credits,
        })
    }

    pub async fn submit_roadmap(
        &self,
        user_id: &str,
        user_email: &str,
        user_input: &str,
    ) -> Result<Submitted, PollError> {
        self.submit(
            JobKind::Roadmap,
            json!({ "userId": user_id, "userEmail": user_email, "userInput": user_input }),
        )
        .await
    }

    pub async fn submit_cover_letter(
        &self,
        user_id: &str,
        user_email: &str,
        job_description: &str,
        user_name: Option<&str>,
    ) -> Result<Submitted, PollError> {
        self.submit(
            JobKind::CoverLetter,
            json!({
                "userId": user_id,
                "userEmail": user_email,
                "jobDescription": job_description,
                "userName": user_name,
            }),
        )
        .await
    }

    pub async fn fetch(&self, kind: JobKind, id: Uuid) -> Result<JobSnapshot, PollError> {
        let url = format!("{}{}", self.base_url, Self::path(kind));
        let request = self.http.get(url).query(&[("id", id.to_string())]);
        let response = self.authorized(request).send().await?;
        JobSnapshot::from_body(Self::read_json(response).await?)
    }

    /// Polls with the kind's profile until the job is terminal.
    pub async fn wait(&self, kind: JobKind, id: Uuid) -> Result<JobSnapshot, PollError> {
        poll_until_terminal(&PollConfig::for_kind(kind), || self.fetch(kind, id)).await
    }
}
