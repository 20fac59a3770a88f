//! In-process repository used by tests. One lock guards everything, which
//! gives `admit` the same all-or-nothing behaviour as the Postgres transaction.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::chat::{check_session_access, ChatStore};
use crate::credits::{self, ConsumeOutcome, CreditLedger};
use crate::errors::AppError;
use crate::jobs::{plan_transition, Admission, JobStore, NewJob, Transition};
use crate::models::chat::{ChatCategory, ChatMessageRow, ChatSessionRow, ChatSessionView, Sender};
use crate::models::credit::CreditAccount;
use crate::models::job::{JobKind, JobRecord, JobResult, JobStatus};

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, CreditAccount>,
    /// Insertion order is kept alongside each job for stable newest-first listing.
    jobs: HashMap<Uuid, (u64, JobRecord)>,
    sessions: Vec<ChatSessionRow>,
    messages: Vec<ChatMessageRow>,
    seq: u64,
}

impl Inner {
    fn account_mut(&mut self, user_id: &str) -> &mut CreditAccount {
        self.accounts
            .entry(user_id.to_string())
            .or_insert_with(|| CreditAccount::with_defaults(user_id))
    }

    fn write_status(
        &mut self,
        id: Uuid,
        next: JobStatus,
        apply: impl FnOnce(&mut JobRecord),
    ) -> Result<Transition, AppError> {
        let (_, job) = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
        let transition = plan_transition(job.status, next);
        if transition == Transition::Applied {
            job.status = next;
            job.updated_at = Utc::now();
            apply(job);
        }
        Ok(transition)
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seeds or overwrites a ledger row.
    pub fn set_account(&self, account: CreditAccount) {
        self.lock()
            .accounts
            .insert(account.user_id.clone(), account);
    }

    pub fn job_count(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }
}

#[async_trait]
impl CreditLedger for MemoryRepository {
    async fn account(&self, user_id: &str) -> Result<CreditAccount, AppError> {
        Ok(self.lock().account_mut(user_id).clone())
    }

    async fn try_consume(&self, user_id: &str, kind: JobKind) -> Result<ConsumeOutcome, AppError> {
        credits::consume(self.lock().account_mut(user_id), kind)
    }
}

#[async_trait]
impl JobStore for MemoryRepository {
    async fn admit(&self, new_job: NewJob) -> Result<Admission, AppError> {
        let mut inner = self.lock();
        let kind = new_job.payload.kind();
        let credits = credits::consume(inner.account_mut(&new_job.user_id), kind)?;

        let now = Utc::now();
        let job = JobRecord {
            id: Uuid::new_v4(),
            user_id: new_job.user_id,
            kind,
            status: kind.initial_status(),
            payload: new_job.payload,
            result: None,
            file_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        inner.seq += 1;
        let seq = inner.seq;
        inner.jobs.insert(job.id, (seq, job.clone()));

        Ok(Admission { job, credits })
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, AppError> {
        Ok(self.lock().jobs.get(&id).map(|(_, job)| job.clone()))
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        kind: JobKind,
    ) -> Result<Vec<JobRecord>, AppError> {
        let inner = self.lock();
        let mut jobs: Vec<_> = inner
            .jobs
            .values()
            .filter(|(_, job)| job.user_id == user_id && job.kind == kind)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(jobs.into_iter().map(|(_, job)| job).collect())
    }

    async fn count_for_user(&self, user_id: &str, kind: JobKind) -> Result<i64, AppError> {
        let inner = self.lock();
        let count = inner
            .jobs
            .values()
            .filter(|(_, job)| job.user_id == user_id && job.kind == kind)
            .count();
        Ok(count as i64)
    }

    async fn advance(&self, id: Uuid, status: JobStatus) -> Result<Transition, AppError> {
        if status.is_terminal() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "advance() cannot set terminal status {status}"
            )));
        }
        self.lock().write_status(id, status, |_| {})
    }

    async fn attach_file(&self, id: Uuid, file_url: &str) -> Result<(), AppError> {
        let mut inner = self.lock();
        let (_, job) = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
        job.file_url = Some(file_url.to_string());
        Ok(())
    }

    async fn complete(&self, id: Uuid, result: JobResult) -> Result<Transition, AppError> {
        self.lock()
            .write_status(id, JobStatus::Completed, |job| job.result = Some(result))
    }

    async fn fail(&self, id: Uuid, reason: &str) -> Result<Transition, AppError> {
        self.lock().write_status(id, JobStatus::Failed, |job| {
            job.error = Some(reason.to_string())
        })
    }
}

#[async_trait]
impl ChatStore for MemoryRepository {
    async fn ensure_session(
        &self,
        session_id: Option<Uuid>,
        user_id: &str,
        category: ChatCategory,
        title: &str,
    ) -> Result<Uuid, AppError> {
        let mut inner = self.lock();
        if let Some(id) = session_id {
            if let Some(existing) = inner.sessions.iter().find(|s| s.id == id) {
                check_session_access(&existing.user_id, &existing.category, user_id, category)?;
                return Ok(id);
            }
        }

        let now = Utc::now();
        let id = session_id.unwrap_or_else(Uuid::new_v4);
        inner.sessions.push(ChatSessionRow {
            id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            category: category.as_str().to_string(),
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn append_message(
        &self,
        session_id: Uuid,
        sender: Sender,
        message: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.lock();
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| AppError::NotFound(format!("Chat session {session_id} not found")))?;
        let now = Utc::now();
        session.updated_at = now;
        inner.messages.push(ChatMessageRow {
            id: Uuid::new_v4(),
            session_id,
            sender: sender.as_str().to_string(),
            message: message.to_string(),
            created_at: now,
        });
        Ok(())
    }

    async fn load_sessions(&self, user_id: &str) -> Result<Vec<ChatSessionView>, AppError> {
        let inner = self.lock();
        // sessions are appended in creation order; newest first means reversed
        Ok(inner
            .sessions
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .map(|session| {
                let messages = inner
                    .messages
                    .iter()
                    .filter(|m| m.session_id == session.id)
                    .cloned()
                    .collect();
                ChatSessionView::from_rows(session.clone(), messages)
            })
            .collect())
    }

    async fn delete_session(&self, session_id: Uuid, user_id: &str) -> Result<bool, AppError> {
        let mut inner = self.lock();
        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|s| !(s.id == session_id && s.user_id == user_id));
        if inner.sessions.len() == before {
            return Ok(false);
        }
        inner.messages.retain(|m| m.session_id != session_id);
        Ok(true)
    }

    async fn count_sessions(&self, user_id: &str) -> Result<i64, AppError> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobPayload;

    fn roadmap_job(user_id: &str) -> NewJob {
        NewJob {
            user_id: user_id.to_string(),
            payload: JobPayload::Roadmap {
                user_input: "become a backend engineer".to_string(),
                user_email: "a@b.com".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_count_for_user_is_scoped_by_user_and_kind() {
        let repo = MemoryRepository::new();
        repo.admit(roadmap_job("u1")).await.unwrap();
        repo.admit(roadmap_job("u1")).await.unwrap();
        repo.admit(roadmap_job("u2")).await.unwrap();

        assert_eq!(repo.count_for_user("u1", JobKind::Roadmap).await.unwrap(), 2);
        assert_eq!(repo.count_for_user("u2", JobKind::Roadmap).await.unwrap(), 1);
        assert_eq!(repo.count_for_user("u1", JobKind::CoverLetter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_admission_decrements_balance_by_one() {
        let repo = MemoryRepository::new();
        let before = repo.balance("u1", JobKind::Roadmap).await.unwrap();
        let admission = repo.admit(roadmap_job("u1")).await.unwrap();
        let after = repo.balance("u1", JobKind::Roadmap).await.unwrap();

        assert_eq!(before.remaining, 3);
        assert_eq!(after.remaining, 2);
        assert_eq!(admission.credits.remaining(), Some(2));
    }

    #[tokio::test]
    async fn test_admission_at_zero_creates_no_job() {
        let repo = MemoryRepository::new();
        let mut account = CreditAccount::with_defaults("u1");
        account.roadmap_credits = 0;
        repo.set_account(account);

        let err = repo.admit(roadmap_job("u1")).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientCredit(JobKind::Roadmap)));
        assert_eq!(repo.job_count(), 0);
        assert_eq!(
            repo.balance("u1", JobKind::Roadmap).await.unwrap().remaining,
            0
        );
    }

    #[tokio::test]
    async fn test_created_job_reads_back_in_initial_state() {
        let repo = MemoryRepository::new();
        let admission = repo.admit(roadmap_job("u1")).await.unwrap();
        let fetched = repo.get(admission.job.id).await.unwrap().unwrap();

        assert_eq!(fetched.status, JobStatus::Processing);
        assert_eq!(fetched.result, None);
        assert_eq!(fetched.payload, admission.job.payload);
    }

    #[tokio::test]
    async fn test_completion_is_idempotent_and_final() {
        let repo = MemoryRepository::new();
        let id = repo.admit(roadmap_job("u1")).await.unwrap().job.id;
        let result = JobResult::Roadmap {
            roadmap_data: "Step 1: Learn Rust".to_string(),
        };

        assert_eq!(
            repo.complete(id, result.clone()).await.unwrap(),
            Transition::Applied
        );
        assert_eq!(
            repo.complete(id, result.clone()).await.unwrap(),
            Transition::Duplicate
        );
        assert_eq!(
            repo.fail(id, "late failure").await.unwrap(),
            Transition::Rejected {
                current: JobStatus::Completed
            }
        );

        let job = repo.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(result));
        assert_eq!(job.error, None);
    }

    #[tokio::test]
    async fn test_unknown_job_transition_is_not_found() {
        let repo = MemoryRepository::new();
        let err = repo.fail(Uuid::new_v4(), "boom").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_session_cascades_messages() {
        let repo = MemoryRepository::new();
        let id = repo
            .ensure_session(None, "u1", ChatCategory::Career, "hello")
            .await
            .unwrap();
        repo.append_message(id, Sender::User, "hi").await.unwrap();
        repo.append_message(id, Sender::Ai, "hello!").await.unwrap();

        assert!(!repo.delete_session(id, "someone-else").await.unwrap());
        assert_eq!(repo.message_count(), 2);

        assert!(repo.delete_session(id, "u1").await.unwrap());
        assert_eq!(repo.message_count(), 0);
        assert_eq!(repo.count_sessions("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_foreign_session_id_is_forbidden() {
        let repo = MemoryRepository::new();
        let id = repo
            .ensure_session(None, "u1", ChatCategory::Career, "mine")
            .await
            .unwrap();
        let err = repo
            .ensure_session(Some(id), "u2", ChatCategory::Career, "theirs")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_session_is_bound_to_its_persona() {
        let repo = MemoryRepository::new();
        let id = repo
            .ensure_session(None, "u1", ChatCategory::Career, "career")
            .await
            .unwrap();
        let err = repo
            .ensure_session(Some(id), "u1", ChatCategory::Buddy, "buddy")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            repo.ensure_session(Some(id), "u1", ChatCategory::Career, "again")
                .await
                .unwrap(),
            id
        );
    }
}
