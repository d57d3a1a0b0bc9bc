use std::sync::Arc;
use std::time::Duration;

use db::models::{CreateExecution, Execution, ExecutionStatus, Task, TriggerType};
use db::repository::Repository;
use events::{DomainEvent, EventBus};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::registry::TimerRegistry;

const MAX_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct DispatchPayload<'a> {
    task_name: &'a str,
    execution_id: Uuid,
}

/// Fires a task: persists the `Execution` row, POSTs the dispatch intent to
/// the project's `execution_endpoint`, and arms the job timeout.
///
/// Grounded on the lineage's `reqwest`-based service-to-service client
/// style (header-bearing client, explicit per-call timeout) rather than a
/// bespoke HTTP stack.
pub struct ExecutionRunner {
    repo: Arc<dyn Repository>,
    bus: Arc<EventBus>,
    timers: Arc<TimerRegistry>,
    client: reqwest::Client,
}

impl ExecutionRunner {
    pub fn new(repo: Arc<dyn Repository>, bus: Arc<EventBus>, timers: Arc<TimerRegistry>) -> Self {
        Self {
            repo,
            bus,
            timers,
            client: reqwest::Client::new(),
        }
    }

    /// Runs the full fire sequence for `task`. The execution row is
    /// persisted before the dispatch POST, so a worker can never observe an
    /// `execution_id` absent from the repository.
    pub async fn fire(&self, task: Task, trigger: TriggerType) -> Result<Execution, ExecutionError> {
        let project = self.repo.get_project_by_id(task.project_id).await?;
        let Some(endpoint) = project.execution_endpoint.as_ref().filter(|e| !e.is_empty()) else {
            return Err(ExecutionError::NoExecutionEndpoint);
        };

        let execution = self
            .repo
            .create_execution(CreateExecution {
                task_id: task.id,
                task_uuid: task.uuid,
                trigger_type: trigger,
            })
            .await?;

        let dispatch_timeout = task
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(MAX_DISPATCH_TIMEOUT)
            .min(MAX_DISPATCH_TIMEOUT);

        let payload = DispatchPayload {
            task_name: &task.name,
            execution_id: execution.uuid,
        };

        let result = self
            .client
            .post(endpoint)
            .header("Authorization", &project.api_key)
            .timeout(dispatch_timeout)
            .json(&payload)
            .send()
            .await;

        let dispatch_ok = match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), execution_uuid = %execution.uuid, "dispatch returned non-2xx");
                false
            }
            Err(err) => {
                warn!(error = %err, execution_uuid = %execution.uuid, "dispatch request failed");
                false
            }
        };

        if !dispatch_ok {
            let updated = self
                .repo
                .update_execution_status(
                    execution.uuid,
                    ExecutionStatus::Failed,
                    Some("dispatch request failed or returned a non-2xx status".to_string()),
                )
                .await?;
            self.bus.publish(DomainEvent::ExecutionFailed {
                execution: updated.clone(),
                task: task.clone(),
            });
            return Ok(updated);
        }

        if let Some(timeout_seconds) = task.timeout_seconds {
            self.arm_timeout(execution.uuid, task.clone(), timeout_seconds);
        }

        Ok(execution)
    }

    fn arm_timeout(&self, execution_uuid: Uuid, task: Task, timeout_seconds: u64) {
        let repo = self.repo.clone();
        let bus = self.bus.clone();
        let timers = self.timers.clone();

        let join = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(timeout_seconds)).await;

            let Ok(current) = repo.get_execution_by_uuid(execution_uuid).await else {
                return;
            };
            if current.status.is_terminal() {
                return;
            }

            let error = format!("timeout after {timeout_seconds}s");
            let Ok(updated) = repo
                .update_execution_status(execution_uuid, ExecutionStatus::Failed, Some(error))
                .await
            else {
                return;
            };

            info!(execution_uuid = %execution_uuid, "execution timed out");
            bus.publish(DomainEvent::ExecutionTimedOut {
                execution: updated.clone(),
                task: task.clone(),
            });
            bus.publish(DomainEvent::ExecutionFailed { execution: updated, task });
            timers.forget(execution_uuid);
        });

        self.timers.arm(execution_uuid, join.abort_handle());
    }
}
