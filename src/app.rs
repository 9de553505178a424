use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/checkins",
            get(handlers::list_recent).post(handlers::create_check_in),
        )
        .route("/api/checkins/today", get(handlers::get_today))
        .route("/api/summary/weekly", get(handlers::get_weekly_summary))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .with_state(state)
}
