use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three kinds of asynchronous AI work a user can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    CvAnalysis,
    Roadmap,
    CoverLetter,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::CvAnalysis, JobKind::Roadmap, JobKind::CoverLetter];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::CvAnalysis => "cv_analysis",
            JobKind::Roadmap => "roadmap",
            JobKind::CoverLetter => "cover_letter",
        }
    }

    /// Human-readable name used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::CvAnalysis => "CV analysis",
            JobKind::Roadmap => "roadmap",
            JobKind::CoverLetter => "cover letter",
        }
    }

    /// Status a freshly admitted job starts in.
    /// CV uploads go through an intake sub-state before they are handed off.
    pub fn initial_status(&self) -> JobStatus {
        match self {
            JobKind::CvAnalysis => JobStatus::Uploading,
            JobKind::Roadmap | JobKind::CoverLetter => JobStatus::Processing,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cv_analysis" => Ok(JobKind::CvAnalysis),
            "roadmap" => Ok(JobKind::Roadmap),
            "cover_letter" => Ok(JobKind::CoverLetter),
            other => Err(format!("unknown job kind '{other}'")),
        }
    }
}

/// Lifecycle state of a job.
///
/// Ranks: `uploading` (0) → `processing` | `pending` (1) → `completed` | `failed` (2).
/// A transition is only legal when it strictly increases the rank, so a
/// terminal status never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Uploading,
    Processing,
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploading => "uploading",
            JobStatus::Processing => "processing",
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Uploading => 0,
            JobStatus::Processing | JobStatus::Pending => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Every status from which `next` is a legal transition.
    pub fn predecessors(next: JobStatus) -> Vec<JobStatus> {
        [
            JobStatus::Uploading,
            JobStatus::Processing,
            JobStatus::Pending,
            JobStatus::Completed,
            JobStatus::Failed,
        ]
        .into_iter()
        .filter(|s| s.can_advance_to(next))
        .collect()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    /// Case-insensitive, so legacy rows written as `"Completed"` still parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uploading" => Ok(JobStatus::Uploading),
            "processing" => Ok(JobStatus::Processing),
            "pending" => Ok(JobStatus::Pending),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// Task-specific input captured at admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    CvAnalysis {
        file_name: String,
        file_size: i64,
    },
    Roadmap {
        user_input: String,
        user_email: String,
    },
    CoverLetter {
        job_description: String,
        user_email: String,
        user_name: Option<String>,
    },
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::CvAnalysis { .. } => JobKind::CvAnalysis,
            JobPayload::Roadmap { .. } => JobKind::Roadmap,
            JobPayload::CoverLetter { .. } => JobKind::CoverLetter,
        }
    }
}

/// Output written back by the executor on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobResult {
    CvAnalysis { analysis: String, score: Option<i32> },
    Roadmap { roadmap_data: String },
    CoverLetter { content: String },
}

impl JobResult {
    pub fn kind(&self) -> JobKind {
        match self {
            JobResult::CvAnalysis { .. } => JobKind::CvAnalysis,
            JobResult::Roadmap { .. } => JobKind::Roadmap,
            JobResult::CoverLetter { .. } => JobKind::CoverLetter,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub user_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub payload: JobPayload,
    pub result: Option<JobResult>,
    pub file_url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn score(&self) -> Option<i32> {
        match &self.result {
            Some(JobResult::CvAnalysis { score, .. }) => *score,
            _ => None,
        }
    }
}
