use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use db::models::{Execution, ExecutionStatus, LogEntry, LogLevel, Project};
use db::repository::Repository;
use events::{DomainEvent, EventBus};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::registry::TimerRegistry;

/// The surface external workers call back into: append a log line, or set
/// the terminal/interim status of an execution they were dispatched for.
///
/// Identity is resolved by the HTTP layer (an `Authorization` header equal
/// to the owning project's `api_key`) before either method runs; this
/// service only enforces that the execution actually belongs to that
/// project.
pub struct ExecutionCallbacks {
    repo: Arc<dyn Repository>,
    bus: Arc<EventBus>,
    timers: Arc<TimerRegistry>,
}

impl ExecutionCallbacks {
    pub fn new(repo: Arc<dyn Repository>, bus: Arc<EventBus>, timers: Arc<TimerRegistry>) -> Self {
        Self { repo, bus, timers }
    }

    async fn authorize(&self, execution_uuid: Uuid, project: &Project) -> Result<Execution, ExecutionError> {
        let execution = self.repo.get_execution_by_uuid(execution_uuid).await?;
        let task = self.repo.get_task_by_id(execution.task_id).await?;
        if task.project_id != project.id {
            return Err(ExecutionError::Forbidden(execution_uuid));
        }
        Ok(execution)
    }

    pub async fn append_log(
        &self,
        execution_uuid: Uuid,
        project: &Project,
        level: LogLevel,
        message: String,
    ) -> Result<(), ExecutionError> {
        self.authorize(execution_uuid, project).await?;
        self.repo
            .append_execution_log(
                execution_uuid,
                LogEntry {
                    ts: Utc::now(),
                    level,
                    message,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn set_status(
        &self,
        execution_uuid: Uuid,
        project: &Project,
        status: &str,
        error: Option<String>,
    ) -> Result<Execution, ExecutionError> {
        self.authorize(execution_uuid, project).await?;
        let status = ExecutionStatus::from_str(status)
            .map_err(|_| ExecutionError::InvalidStatus(status.to_string()))?;

        let updated = self.repo.update_execution_status(execution_uuid, status, error).await?;

        if status.is_terminal() {
            self.timers.cancel(execution_uuid);
        }

        if status == ExecutionStatus::Failed {
            let task = self.repo.get_task_by_id(updated.task_id).await?;
            self.bus.publish(DomainEvent::ExecutionFailed {
                execution: updated.clone(),
                task,
            });
        }

        Ok(updated)
    }
}
