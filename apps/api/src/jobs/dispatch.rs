//! Work Dispatcher: hands admitted jobs to an executor.
//!
//! Fire-and-forget: `dispatch` returns once the event is accepted, never after
//! the work finishes. Two transports:
//! - `LocalDispatcher` runs the executor on this process's tokio runtime.
//! - `InngestDispatcher` publishes the event to Inngest, which later calls
//!   back `POST /api/inngest` with the same event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use super::executor::{max_attempts, Executor};
use crate::models::job::JobKind;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("event rejected (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRef {
    pub job_id: Uuid,
    pub user_id: String,
}

/// CV events carry the extracted text; the PDF itself stays in object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvAnalyzeData {
    pub job_id: Uuid,
    pub user_id: String,
    pub cv_text: String,
}

/// Wire shape is `{ "name": ..., "data": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum JobEvent {
    #[serde(rename = "cv/analyze.requested")]
    CvAnalyze(CvAnalyzeData),
    #[serde(rename = "roadmap/generator.requested")]
    Roadmap(JobRef),
    #[serde(rename = "coverletter/generator.requested")]
    CoverLetter(JobRef),
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::CvAnalyze(_) => "cv/analyze.requested",
            JobEvent::Roadmap(_) => "roadmap/generator.requested",
            JobEvent::CoverLetter(_) => "coverletter/generator.requested",
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobEvent::CvAnalyze(_) => JobKind::CvAnalysis,
            JobEvent::Roadmap(_) => JobKind::Roadmap,
            JobEvent::CoverLetter(_) => JobKind::CoverLetter,
        }
    }

    pub fn job_id(&self) -> Uuid {
        match self {
            JobEvent::CvAnalyze(data) => data.job_id,
            JobEvent::Roadmap(data) | JobEvent::CoverLetter(data) => data.job_id,
        }
    }
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, event: JobEvent) -> Result<(), DispatchError>;
}

pub struct LocalDispatcher {
    executor: Arc<Executor>,
}

impl LocalDispatcher {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Dispatcher for LocalDispatcher {
    async fn dispatch(&self, event: JobEvent) -> Result<(), DispatchError> {
        let executor = Arc::clone(&self.executor);
        let attempts = max_attempts(event.kind());
        info!(
            job_id = %event.job_id(),
            event = event.name(),
            attempts,
            "Spawning local job execution"
        );
        tokio::spawn(async move {
            if let Err(e) = executor.run_with_attempts(&event, attempts).await {
                error!(job_id = %event.job_id(), "Local job execution failed: {e}");
            }
        });
        Ok(())
    }
}

pub struct InngestDispatcher {
    client: Client,
    url: String,
}

impl InngestDispatcher {
    pub fn new(base_url: &str, event_key: &str) -> Result<Self, DispatchError> {
        let client = Client::builder().timeout(PUBLISH_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: event_url(base_url, event_key),
        })
    }
}

fn event_url(base_url: &str, event_key: &str) -> String {
    format!("{}/e/{}", base_url.trim_end_matches('/'), event_key)
}

#[async_trait]
impl Dispatcher for InngestDispatcher {
    async fn dispatch(&self, event: JobEvent) -> Result<(), DispatchError> {
        let response = self.client.post(&self.url).json(&event).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!(job_id = %event.job_id(), event = event.name(), "Job event published");
        Ok(())
    }
}

#[cfg(test)]
pub mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Records events instead of running them. `fail` makes every dispatch error.
    #[derive(Default)]
    pub struct RecordingDispatcher {
        pub events: Mutex<Vec<JobEvent>>,
        pub fail: bool,
    }

    impl RecordingDispatcher {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn count(&self) -> usize {
            self.events.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn dispatch(&self, event: JobEvent) -> Result<(), DispatchError> {
            if self.fail {
                return Err(DispatchError::Rejected {
                    status: 503,
                    body: "event bus unavailable".to_string(),
                });
            }
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let id = Uuid::new_v4();
        let event = JobEvent::Roadmap(JobRef {
            job_id: id,
            user_id: "u1".into(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "roadmap/generator.requested",
                "data": { "jobId": id.to_string(), "userId": "u1" }
            })
        );
        assert_eq!(event.name(), value["name"]);
    }

    #[test]
    fn test_cv_event_parses_from_callback_json() {
        let id = Uuid::new_v4();
        let event: JobEvent = serde_json::from_value(json!({
            "name": "cv/analyze.requested",
            "data": { "jobId": id, "userId": "u1", "cvText": "text" }
        }))
        .unwrap();
        assert_eq!(event.kind(), JobKind::CvAnalysis);
        assert_eq!(event.job_id(), id);
    }

    #[test]
    fn test_unknown_event_name_is_rejected() {
        let parsed = serde_json::from_value::<JobEvent>(json!({
            "name": "billing/charge.requested",
            "data": {}
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_event_url_joins_base_and_key() {
        assert_eq!(event_url("https://inn.gs/", "abc"), "https://inn.gs/e/abc");
        assert_eq!(event_url("http://localhost:8288", "k"), "http://localhost:8288/e/k");
    }
}
