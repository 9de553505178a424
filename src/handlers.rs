use crate::aggregate::build_dashboard;
use crate::errors::AppError;
use crate::models::{CheckIn, Dashboard, NewCheckIn, RecentQuery, UserQuery, WeeklySummary};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn create_check_in(
    State(state): State<AppState>,
    payload: Result<Json<NewCheckIn>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckIn>), AppError> {
    let Json(payload) = payload?;
    let saved = state.backend.create_check_in(payload).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<CheckIn>>, AppError> {
    let user_id = require_user(query.user_id)?;
    let limit = state.config.clamp_limit(query.limit);
    let rows = state.backend.list_recent(&user_id, limit).await?;
    Ok(Json(rows))
}

pub async fn get_today(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Option<CheckIn>>, AppError> {
    let user_id = require_user(query.user_id)?;
    Ok(Json(state.backend.today_check_in(&user_id).await?))
}

pub async fn get_weekly_summary(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<WeeklySummary>, AppError> {
    let user_id = require_user(query.user_id)?;
    Ok(Json(state.backend.weekly_summary(&user_id).await?))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Dashboard>, AppError> {
    let user_id = require_user(query.user_id)?;
    let rows = state
        .backend
        .list_recent(&user_id, state.config.recent_limit)
        .await?;
    Ok(Json(build_dashboard(&rows)))
}

fn require_user(user_id: Option<String>) -> Result<String, AppError> {
    user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("user_id is required"))
}
