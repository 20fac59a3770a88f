use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::job::JobKind;

pub const DEFAULT_CV_ANALYSIS_CREDITS: i32 = 0;
pub const DEFAULT_ROADMAP_CREDITS: i32 = 3;
pub const DEFAULT_COVER_LETTER_CREDITS: i32 = 5;

/// One ledger row per user. Counters never go below zero.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CreditAccount {
    pub user_id: String,
    pub cv_analysis_credits: i32,
    pub roadmap_credits: i32,
    pub cover_letter_credits: i32,
    /// Pro accounts are unlimited; their counters are never touched.
    pub is_pro: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditAccount {
    pub fn with_defaults(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            cv_analysis_credits: DEFAULT_CV_ANALYSIS_CREDITS,
            roadmap_credits: DEFAULT_ROADMAP_CREDITS,
            cover_letter_credits: DEFAULT_COVER_LETTER_CREDITS,
            is_pro: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining(&self, kind: JobKind) -> i32 {
        match kind {
            JobKind::CvAnalysis => self.cv_analysis_credits,
            JobKind::Roadmap => self.roadmap_credits,
            JobKind::CoverLetter => self.cover_letter_credits,
        }
    }

    pub fn counter_mut(&mut self, kind: JobKind) -> &mut i32 {
        match kind {
            JobKind::CvAnalysis => &mut self.cv_analysis_credits,
            JobKind::Roadmap => &mut self.roadmap_credits,
            JobKind::CoverLetter => &mut self.cover_letter_credits,
        }
    }
}

/// Column holding the counter for a job kind.
pub fn credit_column(kind: JobKind) -> &'static str {
    match kind {
        JobKind::CvAnalysis => "cv_analysis_credits",
        JobKind::Roadmap => "roadmap_credits",
        JobKind::CoverLetter => "cover_letter_credits",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditBalance {
    pub remaining: i32,
    pub unlimited: bool,
}
