use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::{check_session_access, ChatStore};
use crate::credits::{self, ConsumeOutcome, CreditLedger};
use crate::errors::AppError;
use crate::jobs::{plan_transition, Admission, JobStore, NewJob, Transition};
use crate::models::chat::{ChatCategory, ChatMessageRow, ChatSessionRow, ChatSessionView, Sender};
use crate::models::credit::{credit_column, CreditAccount};
use crate::models::job::{JobKind, JobRecord, JobResult, JobStatus};

/// PostgreSQL-backed ledger, job store and chat store.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    user_id: String,
    kind: String,
    status: String,
    payload: Value,
    result: Option<Value>,
    file_url: Option<String>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = AppError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, detail: String| {
            AppError::Internal(anyhow::anyhow!("job {} has invalid {what}: {detail}", row.id))
        };
        Ok(JobRecord {
            id: row.id,
            kind: row.kind.parse().map_err(|e| corrupt("kind", e))?,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            payload: serde_json::from_value(row.payload.clone())
                .map_err(|e| corrupt("payload", e.to_string()))?,
            result: row
                .result
                .clone()
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| corrupt("result", e.to_string()))?,
            user_id: row.user_id,
            file_url: row.file_url,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Loads (creating if absent) and row-locks a user's ledger entry.
async fn lock_account(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
) -> Result<CreditAccount, AppError> {
    sqlx::query("INSERT INTO user_credits (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query_as::<_, CreditAccount>("SELECT * FROM user_credits WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NoCreditRecord(user_id.to_string()))
}

async fn consume_locked(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    kind: JobKind,
) -> Result<ConsumeOutcome, AppError> {
    let mut account = lock_account(tx, user_id).await?;
    let outcome = credits::consume(&mut account, kind)?;

    if let ConsumeOutcome::Consumed { remaining } = outcome {
        let sql = format!(
            "UPDATE user_credits SET {} = $2, updated_at = now() WHERE user_id = $1",
            credit_column(kind)
        );
        sqlx::query(&sql)
            .bind(user_id)
            .bind(remaining)
            .execute(&mut **tx)
            .await?;
    }

    Ok(outcome)
}

impl PgRepository {
    /// Conditional status write. Only rows whose current status ranks below
    /// `next` are touched, so concurrent or duplicate callbacks cannot regress a job.
    async fn write_status(
        &self,
        id: Uuid,
        next: JobStatus,
        result: Option<Value>,
        error: Option<&str>,
    ) -> Result<Transition, AppError> {
        let predecessors: Vec<String> = JobStatus::predecessors(next)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let updated = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $2,
                result = COALESCE($3, result),
                error = COALESCE($4, error),
                updated_at = now()
            WHERE id = $1 AND status = ANY($5)
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .bind(result)
        .bind(error)
        .bind(&predecessors)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(Transition::Applied);
        }

        let current: Option<String> = sqlx::query_scalar("SELECT status FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let current: JobStatus = current
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?
            .parse()
            .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;

        let transition = match plan_transition(current, next) {
            // the row moved between the UPDATE and the SELECT
            Transition::Applied => Transition::Rejected { current },
            other => other,
        };
        if let Transition::Rejected { current } = transition {
            warn!(job_id = %id, "Ignored status write {current} -> {next}");
        }
        Ok(transition)
    }
}

#[async_trait]
impl CreditLedger for PgRepository {
    async fn account(&self, user_id: &str) -> Result<CreditAccount, AppError> {
        sqlx::query("INSERT INTO user_credits (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        sqlx::query_as::<_, CreditAccount>("SELECT * FROM user_credits WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NoCreditRecord(user_id.to_string()))
    }

    async fn try_consume(&self, user_id: &str, kind: JobKind) -> Result<ConsumeOutcome, AppError> {
        let mut tx = self.pool.begin().await?;
        let outcome = consume_locked(&mut tx, user_id, kind).await?;
        tx.commit().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl JobStore for PgRepository {
    async fn admit(&self, new_job: NewJob) -> Result<Admission, AppError> {
        let kind = new_job.payload.kind();
        let payload = serde_json::to_value(&new_job.payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize payload: {e}")))?;

        // Credit and job row commit together or not at all.
        let mut tx = self.pool.begin().await?;
        let credits = consume_locked(&mut tx, &new_job.user_id, kind).await?;

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (id, user_id, kind, status, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_job.user_id)
        .bind(kind.as_str())
        .bind(kind.initial_status().as_str())
        .bind(&payload)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let job = JobRecord::try_from(row)?;
        info!(job_id = %job.id, kind = %kind, user_id = %job.user_id, "Job admitted");
        Ok(Admission { job, credits })
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>, AppError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(JobRecord::try_from)
            .transpose()
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        kind: JobKind,
    ) -> Result<Vec<JobRecord>, AppError> {
        sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs WHERE user_id = $1 AND kind = $2 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(JobRecord::try_from)
        .collect()
    }

    async fn count_for_user(&self, user_id: &str, kind: JobKind) -> Result<i64, AppError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE user_id = $1 AND kind = $2")
                .bind(user_id)
                .bind(kind.as_str())
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn advance(&self, id: Uuid, status: JobStatus) -> Result<Transition, AppError> {
        if status.is_terminal() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "advance() cannot set terminal status {status}"
            )));
        }
        self.write_status(id, status, None, None).await
    }

    async fn attach_file(&self, id: Uuid, file_url: &str) -> Result<(), AppError> {
        let updated =
            sqlx::query("UPDATE jobs SET file_url = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(file_url)
                .execute(&self.pool)
                .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {id} not found")));
        }
        Ok(())
    }

    async fn complete(&self, id: Uuid, result: JobResult) -> Result<Transition, AppError> {
        let result = serde_json::to_value(&result)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize result: {e}")))?;
        self.write_status(id, JobStatus::Completed, Some(result), None)
            .await
    }

    async fn fail(&self, id: Uuid, reason: &str) -> Result<Transition, AppError> {
        self.write_status(id, JobStatus::Failed, None, Some(reason))
            .await
    }
}

#[async_trait]
impl ChatStore for PgRepository {
    async fn ensure_session(
        &self,
        session_id: Option<Uuid>,
        user_id: &str,
        category: ChatCategory,
        title: &str,
    ) -> Result<Uuid, AppError> {
        if let Some(id) = session_id {
            let existing: Option<(String, String)> =
                sqlx::query_as("SELECT user_id, category FROM chat_sessions WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
            if let Some((owner, stored_category)) = existing {
                check_session_access(&owner, &stored_category, user_id, category)?;
                return Ok(id);
            }
        }

        let id = session_id.unwrap_or_else(Uuid::new_v4);
        sqlx::query(
            "INSERT INTO chat_sessions (id, user_id, title, category) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(category.as_str())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn append_message(
        &self,
        session_id: Uuid,
        sender: Sender,
        message: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, sender, message) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(sender.as_str())
        .bind(message)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE chat_sessions SET updated_at = now() WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load_sessions(&self, user_id: &str) -> Result<Vec<ChatSessionView>, AppError> {
        let sessions = sqlx::query_as::<_, ChatSessionRow>(
            "SELECT * FROM chat_sessions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
        let messages = sqlx::query_as::<_, ChatMessageRow>(
            "SELECT * FROM chat_messages WHERE session_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_session: HashMap<Uuid, Vec<ChatMessageRow>> = HashMap::new();
        for message in messages {
            by_session.entry(message.session_id).or_default().push(message);
        }

        Ok(sessions
            .into_iter()
            .map(|session| {
                let messages = by_session.remove(&session.id).unwrap_or_default();
                ChatSessionView::from_rows(session, messages)
            })
            .collect())
    }

    async fn delete_session(&self, session_id: Uuid, user_id: &str) -> Result<bool, AppError> {
        // chat_messages rows go with it (ON DELETE CASCADE)
        let deleted = sqlx::query("DELETE FROM chat_sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn count_sessions(&self, user_id: &str) -> Result<i64, AppError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_sessions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}
