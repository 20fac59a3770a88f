pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::dashboard;
use crate::jobs::handlers as jobs;
use crate::pdf::MAX_CV_BYTES;
use crate::state::AppState;

/// Room for multipart framing on top of the largest accepted CV.
const CV_UPLOAD_BODY_LIMIT: usize = MAX_CV_BYTES + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route(
            "/api/roadmap",
            post(jobs::handle_create_roadmap).get(jobs::handle_get_roadmap),
        )
        .route(
            "/api/cover-letter",
            post(jobs::handle_create_cover_letter).get(jobs::handle_get_cover_letter),
        )
        .route(
            "/api/cv-analyze",
            post(jobs::handle_create_cv_analysis)
                .get(jobs::handle_get_cv_analysis)
                .layer(DefaultBodyLimit::max(CV_UPLOAD_BODY_LIMIT)),
        )
        .route("/api/inngest", post(jobs::handle_executor_callback))
        // Chat
        .route("/api/chat-bot", post(chat::handle_career_chat))
        .route("/api/kanka-chat", post(chat::handle_buddy_chat))
        .route("/api/chatload", post(chat::handle_load_chats))
        .route("/api/chatdelete", post(chat::handle_delete_chat))
        // Dashboard
        .route(
            "/api/dashboard-stats",
            get(dashboard::handle_dashboard_stats),
        )
        .with_state(state)
}
