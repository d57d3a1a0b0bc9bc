use std::sync::Arc;

use db::models::{DeleteTaskMessage, TaskStatus};
use db::repository::{Repository, RepositoryError};
use events::{DomainEvent, EventBus};
use scheduler::Scheduler;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::DeleteQueueError;
use crate::queue::DeleteQueue;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeleteOutcomeStatus {
    PendingDelete,
    AlreadyDeleted,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub status: DeleteOutcomeStatus,
    pub task_uuid: Uuid,
    pub message: String,
}

/// Drives both sides of the durable deletion pipeline: the API phase
/// (`request_delete`) and the worker phase (`run_worker`). Both share the
/// same repository/queue/scheduler handles so the worker's unregister and
/// hard-delete stay consistent with whatever the API phase last wrote.
pub struct DeleteService {
    repo: Arc<dyn Repository>,
    bus: Arc<EventBus>,
    queue: Arc<dyn DeleteQueue>,
    scheduler: Arc<Scheduler>,
}

impl DeleteService {
    pub fn new(
        repo: Arc<dyn Repository>,
        bus: Arc<EventBus>,
        queue: Arc<dyn DeleteQueue>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            repo,
            bus,
            queue,
            scheduler,
        }
    }

    /// API phase. Rolls the task's status back to its prior value if the
    /// broker publish fails, so a PENDING_DELETE row is never committed
    /// without a corresponding queued message.
    pub async fn request_delete(&self, task_uuid: Uuid) -> Result<DeleteOutcome, DeleteQueueError> {
        let task = match self.repo.get_task_by_uuid(task_uuid).await {
            Ok(task) => task,
            Err(RepositoryError::NotFound) => {
                return Ok(DeleteOutcome {
                    status: DeleteOutcomeStatus::AlreadyDeleted,
                    task_uuid,
                    message: "task already deleted".to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let prior_status = task.status;
        self.repo.update_task_status(task.id, TaskStatus::PendingDelete).await?;

        let message = DeleteTaskMessage::new(task_uuid, task.project_id);
        if let Err(err) = self.queue.publish(message).await {
            warn!(%task_uuid, error = %err, "delete queue publish failed, rolling back status");
            self.repo.update_task_status(task.id, prior_status).await?;
            return Err(err);
        }

        Ok(DeleteOutcome {
            status: DeleteOutcomeStatus::PendingDelete,
            task_uuid,
            message: "delete request accepted".to_string(),
        })
    }

    /// Worker phase: consumes the queue until its stream ends (broker
    /// disconnect or, for the in-memory queue, sender drop).
    pub async fn run_worker(self: Arc<Self>) -> Result<(), DeleteQueueError> {
        use futures::StreamExt;

        let mut deliveries = self.queue.consume().await?;
        while let Some(delivery) = deliveries.next().await {
            let message = delivery.message().clone();

            let task = match self.repo.get_task_by_uuid(message.task_uuid).await {
                Ok(task) => task,
                Err(RepositoryError::NotFound) => {
                    delivery.ack().await?;
                    continue;
                }
                Err(err) => {
                    error!(task_uuid = %message.task_uuid, error = %err, "repository error in delete worker");
                    delivery.nack(true).await?;
                    continue;
                }
            };

            if let Err(err) = self.scheduler.unregister_task(message.task_uuid).await {
                warn!(task_uuid = %message.task_uuid, error = %err, "unregister during delete failed, continuing");
            }

            match self.repo.hard_delete_task(message.task_uuid).await {
                Ok(()) => {
                    self.bus.publish(DomainEvent::TaskDeleted {
                        task_uuid: message.task_uuid,
                        project_id: message.project_id,
                    });
                    info!(task_uuid = %message.task_uuid, "task hard-deleted");
                    delivery.ack().await?;
                }
                Err(err) => {
                    error!(task_uuid = %message.task_uuid, error = %err, "hard delete failed, marking DELETE_FAILED");
                    self.repo.update_task_status(task.id, TaskStatus::DeleteFailed).await?;
                    delivery.nack(true).await?;
                }
            }
        }
        Ok(())
    }
}
