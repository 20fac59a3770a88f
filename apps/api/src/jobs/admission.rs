//! Admission flow: validate, consume a credit and create the job, hand it off.
//!
//! Validation runs before anything is written, so a rejected request leaves
//! credits and jobs untouched. Once the job row exists, a failed hand-off marks
//! it `failed` rather than leaving it open forever.

use bytes::Bytes;
use tracing::{error, info, warn};

use super::dispatch::{CvAnalyzeData, Dispatcher, JobEvent, JobRef};
use super::{Admission, JobStore, NewJob};
use crate::errors::AppError;
use crate::models::job::{JobPayload, JobRecord, JobStatus};
use crate::pdf::{MAX_CV_BYTES, PDF_CONTENT_TYPE};
use crate::storage::{cv_object_key, FileStore};

/// Fails with the names of every absent or blank field.
pub fn require_fields(fields: &[(&str, Option<&str>)]) -> Result<(), AppError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Content-type and size checks for an uploaded CV. Text extraction follows separately.
pub fn check_cv_file(content_type: Option<&str>, size: usize) -> Result<(), AppError> {
    if content_type != Some(PDF_CONTENT_TYPE) {
        return Err(AppError::Validation(
            "Only PDF files are accepted".to_string(),
        ));
    }
    if size == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if size > MAX_CV_BYTES {
        return Err(AppError::Validation(
            "File is too large. Maximum size is 5MB".to_string(),
        ));
    }
    Ok(())
}

/// Marks an admitted job failed after a hand-off error, then passes the error on.
async fn abandon(jobs: &dyn JobStore, job: &JobRecord, cause: AppError) -> AppError {
    error!(job_id = %job.id, kind = %job.kind, "Job hand-off failed: {cause}");
    if let Err(e) = jobs.fail(job.id, &cause.to_string()).await {
        error!(job_id = %job.id, "Could not mark job failed: {e}");
    }
    cause
}

/// Admits a roadmap or cover-letter job and dispatches it.
pub async fn admit_text_job(
    jobs: &dyn JobStore,
    dispatcher: &dyn Dispatcher,
    new_job: NewJob,
) -> Result<Admission, AppError> {
    let admission = jobs.admit(new_job).await?;
    let job = &admission.job;
    let job_ref = JobRef {
        job_id: job.id,
        user_id: job.user_id.clone(),
    };
    let event = match job.payload {
        JobPayload::Roadmap { .. } => JobEvent::Roadmap(job_ref),
        JobPayload::CoverLetter { .. } => JobEvent::CoverLetter(job_ref),
        JobPayload::CvAnalysis { .. } => {
            let cause = AppError::Internal(anyhow::anyhow!(
                "CV analysis jobs are admitted through admit_cv"
            ));
            return Err(abandon(jobs, job, cause).await);
        }
    };

    if let Err(e) = dispatcher.dispatch(event).await {
        return Err(abandon(jobs, job, e.into()).await);
    }

    info!(
        job_id = %job.id,
        kind = %job.kind,
        user_id = %job.user_id,
        remaining = ?admission.credits.remaining(),
        "Job admitted"
    );
    Ok(admission)
}

/// A validated CV upload with its extracted text.
pub struct CvUpload {
    pub user_id: String,
    pub file_name: String,
    pub bytes: Bytes,
    pub text: String,
}

/// Admits a CV analysis: create the job, store the PDF, dispatch, mark pending.
pub async fn admit_cv(
    jobs: &dyn JobStore,
    files: &dyn FileStore,
    dispatcher: &dyn Dispatcher,
    upload: CvUpload,
) -> Result<Admission, AppError> {
    let new_job = NewJob {
        user_id: upload.user_id.clone(),
        payload: JobPayload::CvAnalysis {
            file_name: upload.file_name.clone(),
            file_size: upload.bytes.len() as i64,
        },
    };
    let admission = jobs.admit(new_job).await?;
    let job = &admission.job;

    let key = cv_object_key(&upload.user_id, job.id, &upload.file_name);
    let file_url = match files.put(&key, upload.bytes, PDF_CONTENT_TYPE).await {
        Ok(url) => url,
        Err(e) => return Err(abandon(jobs, job, e.into()).await),
    };
    if let Err(e) = jobs.attach_file(job.id, &file_url).await {
        return Err(abandon(jobs, job, e).await);
    }

    let event = JobEvent::CvAnalyze(CvAnalyzeData {
        job_id: job.id,
        user_id: upload.user_id,
        cv_text: upload.text,
    });
    if let Err(e) = dispatcher.dispatch(event).await {
        return Err(abandon(jobs, job, e.into()).await);
    }

    // A fast local executor may already have finished; the store ignores the
    // backwards write. The job is already running, so a failed write here is
    // not reported to the client.
    if let Err(e) = jobs.advance(job.id, JobStatus::Pending).await {
        warn!(job_id = %job.id, "Could not mark CV job pending: {e}");
    }

    info!(
        job_id = %job.id,
        user_id = %job.user_id,
        file_url = %file_url,
        remaining = ?admission.credits.remaining(),
        "CV analysis admitted"
    );
    Ok(admission)
}
