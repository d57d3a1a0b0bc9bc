use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use db::models::{DeleteTaskMessage, TaskStatus};
use db::repository::Repository;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::queue::DeleteQueue;

/// Periodic ticker that re-publishes `DeleteTaskMessage`s for tasks stuck
/// in `PENDING_DELETE`/`DELETE_FAILED` past `threshold`, so a crash between
/// the API phase committing and the worker phase acking is never
/// permanent. Stopped cooperatively via `CancellationToken`, the same
/// shape as the lineage's other background loops.
pub struct Reconciler {
    repo: Arc<dyn Repository>,
    queue: Arc<dyn DeleteQueue>,
    interval: Duration,
    threshold: chrono::Duration,
}

impl Reconciler {
    pub fn new(repo: Arc<dyn Repository>, queue: Arc<dyn DeleteQueue>, interval: Duration, threshold: Duration) -> Self {
        Self {
            repo,
            queue,
            interval,
            threshold: chrono::Duration::from_std(threshold).unwrap_or(chrono::Duration::minutes(10)),
        }
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("reconciler stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        let stragglers = match self
            .repo
            .list_tasks_by_status(&[TaskStatus::PendingDelete, TaskStatus::DeleteFailed])
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "reconciler failed to list stragglers");
                return;
            }
        };

        let now = Utc::now();
        let mut republished = 0;
        for task in stragglers {
            if now - task.updated_at < self.threshold {
                continue;
            }
            let message = DeleteTaskMessage::new(task.uuid, task.project_id);
            match self.queue.publish(message).await {
                Ok(()) => republished += 1,
                Err(err) => warn!(task_uuid = %task.uuid, error = %err, "reconciler re-publish failed"),
            }
        }
        if republished > 0 {
            info!(republished, "reconciler re-enqueued stale delete requests");
        }
    }
}
