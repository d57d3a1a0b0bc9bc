use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{patch, post};
use axum::{Json, Router};
use db::models::{LogLevel, Project};
use db::repository::RepositoryError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/executions/{execution_uuid}/logs", post(append_log))
        .route("/executions/{execution_uuid}/status", patch(set_status))
}

/// Resolves the calling project from a raw (no scheme prefix) Authorization
/// header value.
async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Project, ApiError> {
    let api_key = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    match state.repo.get_project_by_api_key(api_key).await {
        Ok(project) => Ok(project),
        Err(RepositoryError::NotFound) => Err(ApiError::Unauthorized),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Deserialize)]
struct AppendLogRequest {
    message: String,
    level: LogLevel,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn append_log(
    State(state): State<AppState>,
    Path(execution_uuid): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AppendLogRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let project = authorize(&state, &headers).await?;
    state
        .callbacks
        .append_log(execution_uuid, &project, body.level, body.message)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Log appended successfully",
    })))
}

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    status: String,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SetStatusResponse {
    message: &'static str,
    status: String,
}

async fn set_status(
    State(state): State<AppState>,
    Path(execution_uuid): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<ApiResponse<SetStatusResponse>>, ApiError> {
    let project = authorize(&state, &headers).await?;
    let updated = state
        .callbacks
        .set_status(execution_uuid, &project, &body.status, body.error)
        .await?;

    Ok(Json(ApiResponse::success(SetStatusResponse {
        message: "Execution status updated successfully",
        status: updated.status.to_string(),
    })))
}
