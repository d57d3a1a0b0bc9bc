use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use db::models::{CreateProject, Project, UpdateProject};
use uuid::Uuid;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create_project))
        .route("/projects/{uuid}", get(get_project).patch(update_project))
}

async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> Result<Json<ApiResponse<Project>>, ApiError> {
    let project = state.repo.create_project(input).await?;
    Ok(Json(ApiResponse::success(project)))
}

async fn get_project(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<ApiResponse<Project>>, ApiError> {
    let project = state.repo.get_project_by_uuid(uuid).await?;
    Ok(Json(ApiResponse::success(project)))
}

async fn update_project(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(update): Json<UpdateProject>,
) -> Result<Json<ApiResponse<Project>>, ApiError> {
    let project = state.repo.get_project_by_uuid(uuid).await?;
    let updated = state.repo.update_project(project.id, update).await?;
    Ok(Json(ApiResponse::success(updated)))
}
