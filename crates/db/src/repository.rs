use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    execution::{CreateExecution, Execution, ExecutionStatus, LogEntry},
    project::{CreateProject, Project, UpdateProject},
    task::{CreateTask, Task, TaskState, TaskStatus, UpdateTask},
    task_group::{CreateTaskGroup, GroupState, TaskGroup, UpdateTaskGroup},
};

/// Unified error for every storage backend behind [`Repository`].
///
/// `NotFound` is the well-known not-found signal: callers on delete/read-
/// then-delete paths match on it explicitly to normalise to idempotent
/// success.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("storage error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// A page of executions plus the total row count in the requested day window.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionPage {
    pub items: Vec<Execution>,
    pub total: u64,
}

/// Typed persistence boundary for projects, tasks, groups, and executions.
///
/// This is the *only* thing the core (scheduler, runner, delete workflow)
/// depends on for storage; no concrete database driver is named here.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Project ---
    async fn create_project(&self, input: CreateProject) -> Result<Project>;
    async fn get_project_by_id(&self, id: i64) -> Result<Project>;
    async fn get_project_by_uuid(&self, uuid: Uuid) -> Result<Project>;
    /// Resolves the project owning a worker-supplied `Authorization` header
    /// value, for the execution status/log callback surface.
    async fn get_project_by_api_key(&self, api_key: &str) -> Result<Project>;
    async fn update_project(&self, id: i64, update: UpdateProject) -> Result<Project>;

    // --- TaskGroup ---
    async fn create_task_group(&self, input: CreateTaskGroup) -> Result<TaskGroup>;
    async fn get_task_group_by_id(&self, id: i64) -> Result<TaskGroup>;
    async fn get_task_group_by_uuid(&self, uuid: Uuid) -> Result<TaskGroup>;
    async fn list_task_groups_by_project(&self, project_id: i64) -> Result<Vec<TaskGroup>>;
    /// Every `ACTIVE` group with both `start_time` and `end_time` set, for
    /// scheduler startup rehydration.
    async fn list_active_windowed_groups(&self) -> Result<Vec<TaskGroup>>;
    async fn update_task_group(&self, id: i64, update: UpdateTaskGroup) -> Result<TaskGroup>;
    async fn update_task_group_state(&self, id: i64, state: GroupState) -> Result<()>;
    /// Hard-deletes the group and ungroups (does not delete) its tasks,
    /// re-activating any task that was `ACTIVE` while grouped.
    async fn delete_task_group(&self, id: i64) -> Result<()>;

    // --- Task ---
    async fn create_task(&self, input: CreateTask) -> Result<Task>;
    async fn get_task_by_id(&self, id: i64) -> Result<Task>;
    async fn get_task_by_uuid(&self, uuid: Uuid) -> Result<Task>;
    async fn list_tasks_by_project(&self, project_id: i64) -> Result<Vec<Task>>;
    async fn list_tasks_by_group(&self, group_id: i64) -> Result<Vec<Task>>;
    async fn list_tasks_by_status(&self, statuses: &[TaskStatus]) -> Result<Vec<Task>>;
    /// Every task with a non-empty `cron_expression`, for scheduler startup
    /// rehydration (gating is re-evaluated per task by the caller).
    async fn list_cron_eligible_tasks(&self) -> Result<Vec<Task>>;
    async fn update_task(&self, id: i64, update: UpdateTask) -> Result<Task>;
    async fn update_task_status(&self, id: i64, status: TaskStatus) -> Result<Task>;
    async fn update_task_state(&self, id: i64, state: TaskState) -> Result<()>;
    /// Idempotent: deleting an already-absent task is `Ok(())`, not
    /// `NotFound` — callers that need to distinguish should check existence
    /// first via `get_task_by_uuid`.
    async fn hard_delete_task(&self, uuid: Uuid) -> Result<()>;

    // --- Execution ---
    async fn create_execution(&self, input: CreateExecution) -> Result<Execution>;
    async fn get_execution_by_uuid(&self, uuid: Uuid) -> Result<Execution>;
    async fn update_execution_status(
        &self,
        uuid: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
    ) -> Result<Execution>;
    async fn append_execution_log(&self, uuid: Uuid, entry: LogEntry) -> Result<()>;
    /// `page_size` is capped at 100 by the caller; the repository does not
    /// re-validate it.
    async fn list_executions_by_task_paginated(
        &self,
        task_id: i64,
        day: NaiveDate,
        page: u32,
        page_size: u32,
    ) -> Result<ExecutionPage>;
}
