// Job lifecycle: credit-gated admission, hand-off to an executor, status polling.
// Shared by CV analysis, roadmap generation and cover-letter generation.

pub mod admission;
pub mod dispatch;
pub mod executor;
pub mod handlers;
pub mod poller;
pub mod prompts;

use async_trait::async_trait;
use uuid::Uuid;

use crate::credits::ConsumeOutcome;
use crate::errors::AppError;
use crate::models::job::{JobKind, JobPayload, JobRecord, JobResult, JobStatus};

/// Input for admitting a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: String,
    pub payload: JobPayload,
}

/// A job that passed the credit check and now exists in the store.
#[derive(Debug, Clone)]
pub struct Admission {
    pub job: JobRecord,
    pub credits: ConsumeOutcome,
}

/// Outcome of a status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The job was already in the requested status; nothing changed.
    Duplicate,
    /// The write would have moved the job backwards (or sideways out of a
    /// terminal status) and was ignored.
    Rejected { current: JobStatus },
}

/// Decides what a write of `next` does to a job currently in `current`.
pub fn plan_transition(current: JobStatus, next: JobStatus) -> Transition {
    if current.can_advance_to(next) {
        Transition::Applied
    } else if current == next {
        Transition::Duplicate
    } else {
        Transition::Rejected { current }
    }
}

/// Job Record Store.
///
/// `admit` is the only way a job row comes into existence, and it consumes the
/// credit in the same atomic unit. Status writes go through `advance`,
/// `complete` and `fail`, which enforce monotonic transitions.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn admit(&self, new_job: NewJob) -> Result<Admission, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, AppError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: &str, kind: JobKind)
        -> Result<Vec<JobRecord>, AppError>;

    async fn count_for_user(&self, user_id: &str, kind: JobKind) -> Result<i64, AppError>;

    /// Moves a job to a non-terminal intermediate status.
    async fn advance(&self, id: Uuid, status: JobStatus) -> Result<Transition, AppError>;

    async fn attach_file(&self, id: Uuid, file_url: &str) -> Result<(), AppError>;

    async fn complete(&self, id: Uuid, result: JobResult) -> Result<Transition, AppError>;

    async fn fail(&self, id: Uuid, reason: &str) -> Result<Transition, AppError>;
}
