//! Dashboard statistics: activity counts, average CV score and credit balances.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::credit::CreditAccount;
use crate::models::job::{JobKind, JobRecord};
use crate::state::AppState;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditSummary {
    pub cover_letter: i32,
    pub roadmap: i32,
    pub cv_analysis: i32,
    pub is_pro: bool,
}

impl From<&CreditAccount> for CreditSummary {
    fn from(account: &CreditAccount) -> Self {
        Self {
            cover_letter: account.cover_letter_credits,
            roadmap: account.roadmap_credits,
            cv_analysis: account.cv_analysis_credits,
            is_pro: account.is_pro,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub cv_analyzed: usize,
    pub career_score: i32,
    pub days_active: i64,
    pub cover_letters: i64,
    pub roadmaps: i64,
    pub ai_chats: i64,
    pub credits: CreditSummary,
}

/// Rounded mean of the scores that exist, or 0.
pub fn career_score(cv_jobs: &[JobRecord]) -> i32 {
    let scores: Vec<i32> = cv_jobs.iter().filter_map(JobRecord::score).collect();
    if scores.is_empty() {
        return 0;
    }
    let sum: i64 = scores.iter().map(|&s| i64::from(s)).sum();
    (sum as f64 / scores.len() as f64).round() as i32
}

/// Whole days spanned by the CV history, at least 1.
pub fn days_active(cv_jobs: &[JobRecord]) -> i64 {
    let first = cv_jobs.iter().map(|job| job.created_at).min();
    let last = cv_jobs.iter().map(|job| job.created_at).max();
    match (first, last) {
        (Some(first), Some(last)) => {
            let days = (last - first).num_seconds() as f64 / SECONDS_PER_DAY;
            (days.ceil() as i64).max(1)
        }
        _ => 1,
    }
}

pub async fn collect_stats(state: &AppState, user_id: &str) -> Result<DashboardStats, AppError> {
    let account = state.credits.account(user_id).await?;
    let cv_jobs = state
        .jobs
        .list_for_user(user_id, JobKind::CvAnalysis)
        .await?;
    // only CV rows are loaded; their scores feed careerScore
    let cover_letters = state
        .jobs
        .count_for_user(user_id, JobKind::CoverLetter)
        .await?;
    let roadmaps = state.jobs.count_for_user(user_id, JobKind::Roadmap).await?;
    let ai_chats = state.chats.count_sessions(user_id).await?;

    Ok(DashboardStats {
        cv_analyzed: cv_jobs.len(),
        career_score: career_score(&cv_jobs),
        days_active: days_active(&cv_jobs),
        cover_letters,
        roadmaps,
        ai_chats,
        credits: CreditSummary::from(&account),
    })
}

/// GET /api/dashboard-stats
pub async fn handle_dashboard_stats(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardStats>, AppError> {
    let user_id = caller.resolve(query.user_id.as_deref())?;
    Ok(Json(collect_stats(&state, &user_id).await?))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::job::{JobPayload, JobResult, JobStatus};

    fn cv_job(days_ago: i64, score: Option<i32>) -> JobRecord {
        let created_at = Utc::now() - Duration::days(days_ago);
        JobRecord {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            kind: JobKind::CvAnalysis,
            status: if score.is_some() {
                JobStatus::Completed
            } else {
                JobStatus::Pending
            },
            payload: JobPayload::CvAnalysis {
                file_name: "cv.pdf".into(),
                file_size: 10,
            },
            result: score.map(|score| JobResult::CvAnalysis {
                analysis: format!("SCORE: {score}"),
                score: Some(score),
            }),
            file_url: None,
            error: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_career_score_averages_present_scores() {
        let jobs = vec![cv_job(3, Some(70)), cv_job(2, None), cv_job(1, Some(85))];
        assert_eq!(career_score(&jobs), 78);
    }

    #[test]
    fn test_career_score_defaults_to_zero() {
        assert_eq!(career_score(&[]), 0);
        assert_eq!(career_score(&[cv_job(0, None)]), 0);
    }

    #[test]
    fn test_days_active() {
        assert_eq!(days_active(&[]), 1);
        assert_eq!(days_active(&[cv_job(0, None)]), 1);
        assert_eq!(days_active(&[cv_job(0, None), cv_job(5, None)]), 5);

        let mut partial = cv_job(0, None);
        partial.created_at -= Duration::hours(30);
        assert_eq!(days_active(&[cv_job(0, None), partial]), 2);
    }
}
