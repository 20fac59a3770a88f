//! Job Executor: turns a dispatched event into a terminal job.
//!
//! Delivery is at-least-once, so a job that is already terminal is skipped.
//! A failed attempt marks the job `failed` only when no retry follows it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{info, warn};

use super::dispatch::JobEvent;
use super::prompts;
use super::{JobStore, Transition};
use crate::errors::AppError;
use crate::formatting::{cover_letter, cv, roadmap};
use crate::llm_client::TextGenerator;
use crate::models::job::{JobKind, JobPayload, JobRecord, JobResult};
use crate::notify::{Notifier, PushMessage};

const CV_ATTEMPTS: u32 = 4;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Attempts per event: CV analysis retries three times, the rest run once.
pub fn max_attempts(kind: JobKind) -> u32 {
    match kind {
        JobKind::CvAnalysis => CV_ATTEMPTS,
        JobKind::Roadmap | JobKind::CoverLetter => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The job was already terminal when the event arrived.
    Skipped,
}

pub struct Executor {
    jobs: Arc<dyn JobStore>,
    llm: Arc<dyn TextGenerator>,
    notifier: Arc<dyn Notifier>,
    app_url: String,
    retry_delay: Duration,
}

impl Executor {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        llm: Arc<dyn TextGenerator>,
        notifier: Arc<dyn Notifier>,
        app_url: String,
    ) -> Self {
        Self {
            jobs,
            llm,
            notifier,
            app_url,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Runs attempt `attempt` (0-based) of `max_attempts`. When the last
    /// attempt fails the job is marked `failed` before the error is returned.
    pub async fn handle_attempt(
        &self,
        event: &JobEvent,
        attempt: u32,
        max_attempts: u32,
    ) -> Result<RunOutcome, AppError> {
        match self.run_once(event).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let final_attempt = attempt + 1 >= max_attempts;
                warn!(
                    job_id = %event.job_id(),
                    attempt = attempt + 1,
                    max_attempts,
                    final_attempt,
                    "Job attempt failed: {e}"
                );
                if final_attempt {
                    self.jobs.fail(event.job_id(), &e.to_string()).await?;
                }
                Err(e)
            }
        }
    }

    /// Local retry loop with exponential backoff between attempts.
    pub async fn run_with_attempts(
        &self,
        event: &JobEvent,
        max_attempts: u32,
    ) -> Result<RunOutcome, AppError> {
        let mut attempt = 0;
        loop {
            match self.handle_attempt(event, attempt, max_attempts).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if attempt + 1 >= max_attempts => return Err(e),
                Err(_) => {
                    tokio::time::sleep(self.retry_delay * 2u32.pow(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn run_once(&self, event: &JobEvent) -> Result<RunOutcome, AppError> {
        let job_id = event.job_id();
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

        if job.status.is_terminal() {
            info!(job_id = %job_id, status = %job.status, "Job already terminal, skipping");
            return Ok(RunOutcome::Skipped);
        }

        let result = self.generate(event, &job).await?;
        let score = match &result {
            JobResult::CvAnalysis { score, .. } => *score,
            _ => None,
        };

        let transition = self.jobs.complete(job_id, result).await?;
        info!(
            job_id = %job_id,
            kind = %job.kind,
            user_id = %job.user_id,
            ?transition,
            "Job completed"
        );

        if job.kind == JobKind::CvAnalysis && transition == Transition::Applied {
            self.notify_cv_ready(&job, score).await;
        }

        Ok(RunOutcome::Completed)
    }

    async fn generate(&self, event: &JobEvent, job: &JobRecord) -> Result<JobResult, AppError> {
        match (event, &job.payload) {
            (JobEvent::CvAnalyze(data), JobPayload::CvAnalysis { .. }) => {
                let analysis = self
                    .llm
                    .generate(prompts::cv_analysis_request(&data.cv_text))
                    .await?;
                let score = cv::extract_score(&analysis);
                Ok(JobResult::CvAnalysis { analysis, score })
            }
            (JobEvent::Roadmap(_), JobPayload::Roadmap { user_input, .. }) => {
                let raw = self.llm.generate(prompts::roadmap_request(user_input)).await?;
                Ok(JobResult::Roadmap {
                    roadmap_data: roadmap::normalize(&raw),
                })
            }
            (
                JobEvent::CoverLetter(_),
                JobPayload::CoverLetter {
                    job_description,
                    user_email,
                    user_name,
                },
            ) => {
                let raw = self
                    .llm
                    .generate(prompts::cover_letter_request(
                        job_description,
                        user_name.as_deref(),
                        Some(user_email.as_str()),
                    ))
                    .await?;
                Ok(JobResult::CoverLetter {
                    content: cover_letter::clean(&raw),
                })
            }
            _ => Err(AppError::Internal(anyhow!(
                "event {} does not match {} job {}",
                event.name(),
                job.kind,
                job.id
            ))),
        }
    }

    async fn notify_cv_ready(&self, job: &JobRecord, score: Option<i32>) {
        let body = match score {
            Some(score) => format!("Your CV scored {score}/100. Tap to see the full report."),
            None => "Your CV analysis is ready. Tap to see the full report.".to_string(),
        };
        let message = PushMessage {
            user_id: job.user_id.clone(),
            heading: "CV analysis complete".to_string(),
            body,
            url: Some(format!(
                "{}/cv-analyze?id={}",
                self.app_url.trim_end_matches('/'),
                job.id
            )),
        };
        if let Err(e) = self.notifier.send(message).await {
            warn!(job_id = %job.id, "Push notification failed: {e}");
        }
    }
}
