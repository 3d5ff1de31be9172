//! v1 API endpoints

pub mod workflows;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/workflow", get(workflows::get_workflow))
        .route("/workflow/start", post(workflows::start_session))
        .route("/workflow/answer", post(workflows::submit_answer))
}
