use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use db::models::{CreateTask, Task, TaskStatus, TriggerType, UpdateTask};
use db::repository::ExecutionPage;
use delete::DeleteOutcome;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_uuid}/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{uuid}", get(get_task).patch(update_task).delete(delete_task))
        .route("/tasks/{uuid}/status", post(update_task_status))
        .route("/tasks/{uuid}/trigger", post(trigger_task))
        .route("/tasks/{uuid}/executions", get(list_task_executions))
}

async fn create_task(
    State(state): State<AppState>,
    Path(project_uuid): Path<Uuid>,
    Json(mut input): Json<CreateTask>,
) -> Result<Json<ApiResponse<Task>>, ApiError> {
    let project = state.repo.get_project_by_uuid(project_uuid).await?;
    input.project_id = project.id;
    if let Err(err) = input.schedule_config.validate() {
        return Err(ApiError::Validation(err));
    }

    let task = state.repo.create_task(input).await?;
    state.scheduler.register_task(&task).await?;
    state.bus.publish(events::DomainEvent::TaskCreated(task.clone()));

    Ok(Json(ApiResponse::success(task)))
}

async fn list_tasks(
    State(state): State<AppState>,
    Path(project_uuid): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Task>>>, ApiError> {
    let project = state.repo.get_project_by_uuid(project_uuid).await?;
    let tasks = state.repo.list_tasks_by_project(project.id).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

async fn get_task(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<ApiResponse<Task>>, ApiError> {
    let task = state.repo.get_task_by_uuid(uuid).await?;
    Ok(Json(ApiResponse::success(task)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(update): Json<UpdateTask>,
) -> Result<Json<ApiResponse<Task>>, ApiError> {
    if let Some(status) = update.status
        && !status.is_client_settable()
    {
        return Err(ApiError::Validation(format!("{status} cannot be set by clients")));
    }
    if let Some(cfg) = &update.schedule_config {
        cfg.validate().map_err(ApiError::Validation)?;
    }

    let existing = state.repo.get_task_by_uuid(uuid).await?;
    let task = state.repo.update_task(existing.id, update).await?;

    state.scheduler.unregister_task(task.uuid).await?;
    state.scheduler.register_task(&task).await?;
    state.bus.publish(events::DomainEvent::TaskUpdated(task.clone()));

    Ok(Json(ApiResponse::success(task)))
}

#[derive(Debug, Deserialize)]
struct UpdateTaskStatusRequest {
    status: TaskStatus,
}

async fn update_task_status(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<UpdateTaskStatusRequest>,
) -> Result<Json<ApiResponse<Task>>, ApiError> {
    if !body.status.is_client_settable() {
        return Err(ApiError::Validation(format!("{} cannot be set by clients", body.status)));
    }

    let existing = state.repo.get_task_by_uuid(uuid).await?;
    let task = state.repo.update_task_status(existing.id, body.status).await?;

    state.scheduler.unregister_task(task.uuid).await?;
    state.scheduler.register_task(&task).await?;
    state.bus.publish(events::DomainEvent::TaskUpdated(task.clone()));

    Ok(Json(ApiResponse::success(task)))
}

/// Fires the task immediately, outside its normal cron/group schedule.
async fn trigger_task(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<ApiResponse<db::models::Execution>>, ApiError> {
    let task = state.repo.get_task_by_uuid(uuid).await?;
    let execution = state.runner.fire(task, TriggerType::Manual).await?;
    Ok(Json(ApiResponse::success(execution)))
}

#[derive(Debug, Deserialize)]
struct ListExecutionsQuery {
    day: NaiveDate,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_page_size")]
    page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Executions for one task on a single UTC calendar day, paginated.
/// `page_size` above 100 is silently capped by the repository.
async fn list_task_executions(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<ApiResponse<ExecutionPage>>, ApiError> {
    let task = state.repo.get_task_by_uuid(uuid).await?;
    let page = state
        .repo
        .list_executions_by_task_paginated(task.id, query.day, query.page, query.page_size)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<DeleteOutcome>>), ApiError> {
    let outcome = state.delete_service.request_delete(uuid).await?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(outcome))))
}
