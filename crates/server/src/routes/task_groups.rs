use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use db::models::{CreateTaskGroup, GroupState, TaskGroup, UpdateTaskGroup};
use uuid::Uuid;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_uuid}/task-groups",
            get(list_task_groups).post(create_task_group),
        )
        .route("/task-groups/{uuid}", get(get_task_group).patch(update_task_group))
}

async fn create_task_group(
    State(state): State<AppState>,
    Path(project_uuid): Path<Uuid>,
    Json(mut input): Json<CreateTaskGroup>,
) -> Result<Json<ApiResponse<TaskGroup>>, ApiError> {
    let project = state.repo.get_project_by_uuid(project_uuid).await?;
    input.project_id = project.id;
    let group = state.repo.create_task_group(input).await?;

    if group.status == db::models::GroupStatus::Active && group.has_window() {
        state.scheduler.install_group_window(&group).await?;
    }

    Ok(Json(ApiResponse::success(group)))
}

async fn list_task_groups(
    State(state): State<AppState>,
    Path(project_uuid): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<TaskGroup>>>, ApiError> {
    let project = state.repo.get_project_by_uuid(project_uuid).await?;
    let groups = state.repo.list_task_groups_by_project(project.id).await?;
    Ok(Json(ApiResponse::success(groups)))
}

async fn get_task_group(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<ApiResponse<TaskGroup>>, ApiError> {
    let group = state.repo.get_task_group_by_uuid(uuid).await?;
    Ok(Json(ApiResponse::success(group)))
}

/// Re-installs the group's window jobs and, if the update takes the group
/// out of `Running`, pushes the state transition to member tasks right away
/// rather than waiting for the next window tick.
async fn update_task_group(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(update): Json<UpdateTaskGroup>,
) -> Result<Json<ApiResponse<TaskGroup>>, ApiError> {
    let existing = state.repo.get_task_group_by_uuid(uuid).await?;
    let updated = state.repo.update_task_group(existing.id, update).await?;

    state.scheduler.unregister_group_window(updated.uuid).await?;
    if updated.status == db::models::GroupStatus::Active && updated.has_window() {
        state.scheduler.install_group_window(&updated).await?;
    }

    if updated.state == GroupState::NotRunning {
        let tasks = state.repo.list_tasks_by_group(updated.id).await?;
        for task in tasks {
            state.repo.update_task_state(task.id, db::models::TaskState::NotRunning).await?;
            state.scheduler.unregister_task(task.uuid).await?;
        }
    }

    Ok(Json(ApiResponse::success(updated)))
}
