use std::sync::Arc;

use chrono::Utc;
use db::models::{GroupState, GroupStatus, Task, TaskGroup, TaskState, TaskStatus, TriggerType};
use db::repository::{Repository, RepositoryError};
use events::{DomainEvent, EventBus, Topic};
use execution::ExecutionRunner;
use futures::stream::{select_all, StreamExt};
use parking_lot::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::maps::SchedulerMaps;
use crate::window::{daily_utc_cron, is_within_window};

const ALL_TOPICS: [Topic; 8] = [
    Topic::TaskCreated,
    Topic::TaskUpdated,
    Topic::TaskDeleted,
    Topic::TaskGroupCreated,
    Topic::TaskGroupUpdated,
    Topic::TaskGroupDeleted,
    Topic::ExecutionFailed,
    Topic::ExecutionTimedOut,
];

/// Cron registry and group-window gate. Wraps `tokio_cron_scheduler`'s
/// `JobScheduler`, whose `Uuid` job handles double as the opaque
/// "cron-entry-id" this component is built around.
pub struct Scheduler {
    maps: RwLock<SchedulerMaps>,
    cron: JobScheduler,
    repo: Arc<dyn Repository>,
    bus: Arc<EventBus>,
    runner: Arc<ExecutionRunner>,
}

impl Scheduler {
    pub async fn new(
        repo: Arc<dyn Repository>,
        bus: Arc<EventBus>,
        runner: Arc<ExecutionRunner>,
    ) -> Result<Arc<Self>, SchedulerError> {
        let cron = JobScheduler::new().await?;
        let scheduler = Arc::new(Self {
            maps: RwLock::new(SchedulerMaps::default()),
            cron,
            repo,
            bus,
            runner,
        });
        scheduler.cron.start().await?;
        Ok(scheduler)
    }

    /// Loads active windowed groups and cron-eligible tasks, registering
    /// everything whose gating condition already holds. Called once at
    /// process start.
    pub async fn rehydrate(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let groups = self.repo.list_active_windowed_groups().await?;
        for group in &groups {
            self.install_group_window(group).await?;
        }

        let tasks = self.repo.list_cron_eligible_tasks().await?;
        for task in &tasks {
            self.register_task(task).await?;
        }

        info!(groups = groups.len(), tasks = tasks.len(), "scheduler rehydrated");
        Ok(())
    }

    /// Subscribes to the eight domain-event topics and serialises handling
    /// in a single loop, so updates/deletes for one task_uuid never
    /// interleave. Runs until the bus side of every channel closes.
    pub async fn run_event_loop(self: Arc<Self>) {
        let streams = ALL_TOPICS
            .into_iter()
            .map(|topic| ReceiverStream::new(self.bus.subscribe(topic)))
            .collect::<Vec<_>>();
        let mut merged = select_all(streams);

        while let Some(event) = merged.next().await {
            if let Err(err) = self.handle_event(event).await {
                warn!(error = %err, "scheduler event handler failed");
            }
        }
    }

    async fn handle_event(self: &Arc<Self>, event: DomainEvent) -> Result<(), SchedulerError> {
        match event {
            DomainEvent::TaskCreated(task) | DomainEvent::TaskUpdated(task) => {
                self.unregister_task(task.uuid).await?;
                self.register_task(&task).await?;
            }
            DomainEvent::TaskDeleted { task_uuid, .. } => {
                self.unregister_task(task_uuid).await?;
            }
            DomainEvent::TaskGroupCreated(group) | DomainEvent::TaskGroupUpdated(group) => {
                self.install_group_window(&group).await?;
            }
            DomainEvent::TaskGroupDeleted { group_uuid, .. } => {
                self.unregister_group_window(group_uuid).await?;
            }
            DomainEvent::ExecutionFailed { .. } | DomainEvent::ExecutionTimedOut { .. } => {}
        }
        Ok(())
    }

    /// Registers `task`'s cron entry iff the gating algorithm passes.
    /// Returns whether it was actually registered. A cron-parse failure is
    /// logged and treated as a (non-error) skip.
    pub async fn register_task(&self, task: &Task) -> Result<bool, SchedulerError> {
        if !task.has_cron() {
            return Ok(false);
        }

        if let Some(group_id) = task.task_group_id {
            let group = match self.repo.get_task_group_by_id(group_id).await {
                Ok(group) => group,
                Err(RepositoryError::NotFound) => return Ok(false),
                Err(err) => return Err(err.into()),
            };
            let eligible = group.status == GroupStatus::Active
                && group.has_window()
                && is_within_window(
                    group.start_time.as_deref().unwrap_or_default(),
                    group.end_time.as_deref().unwrap_or_default(),
                    &group.timezone,
                    Utc::now(),
                );
            if !eligible {
                return Ok(false);
            }
        } else if task.status != TaskStatus::Active {
            return Ok(false);
        }

        let cron_expr = task
            .schedule_config
            .cron_expression
            .clone()
            .expect("has_cron() guarantees cron_expression is Some");

        let repo = self.repo.clone();
        let runner = self.runner.clone();
        let task_uuid = task.uuid;

        let job = match Job::new_async(cron_expr.as_str(), move |_job_id, _scheduler| {
            let repo = repo.clone();
            let runner = runner.clone();
            Box::pin(async move {
                match repo.get_task_by_uuid(task_uuid).await {
                    Ok(task) => {
                        if let Err(err) = runner.fire(task, TriggerType::Scheduled).await {
                            warn!(%task_uuid, error = %err, "scheduled fire failed");
                        }
                    }
                    Err(_) => warn!(%task_uuid, "cron fired for a task no longer in the repository"),
                }
            })
        }) {
            Ok(job) => job,
            Err(err) => {
                warn!(task_uuid = %task.uuid, cron = %cron_expr, error = %err, "invalid cron expression, skipping registration");
                return Ok(false);
            }
        };

        let mut cron = self.cron.clone();
        let job_id = cron.add(job).await?;
        self.maps.write().tasks.insert(task.uuid, job_id);
        Ok(true)
    }

    /// Idempotent: unregistering a task with no current entry is a no-op.
    pub async fn unregister_task(&self, task_uuid: Uuid) -> Result<(), SchedulerError> {
        let job_id = self.maps.write().tasks.remove(&task_uuid);
        if let Some(job_id) = job_id {
            let mut cron = self.cron.clone();
            cron.remove(&job_id).await?;
        }
        Ok(())
    }

    /// The group's daily start job: flips `state=RUNNING` on the group and
    /// on every task that successfully registers under the now-satisfied
    /// gating condition.
    pub async fn start_group(self: &Arc<Self>, group_uuid: Uuid) -> Result<(), SchedulerError> {
        let group = match self.repo.get_task_group_by_uuid(group_uuid).await {
            Ok(group) => group,
            Err(RepositoryError::NotFound) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        self.repo.update_task_group_state(group.id, GroupState::Running).await?;

        for task in self.repo.list_tasks_by_group(group.id).await? {
            if self.register_task(&task).await? {
                self.repo.update_task_state(task.id, TaskState::Running).await?;
            }
        }
        Ok(())
    }

    /// The group's daily end job: flips `state=NOT_RUNNING` on the group
    /// and unconditionally on every member task, unregistering each.
    pub async fn stop_group(self: &Arc<Self>, group_uuid: Uuid) -> Result<(), SchedulerError> {
        let group = match self.repo.get_task_group_by_uuid(group_uuid).await {
            Ok(group) => group,
            Err(RepositoryError::NotFound) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        self.repo.update_task_group_state(group.id, GroupState::NotRunning).await?;

        for task in self.repo.list_tasks_by_group(group.id).await? {
            self.unregister_task(task.uuid).await?;
            self.repo.update_task_state(task.id, TaskState::NotRunning).await?;
        }
        Ok(())
    }

    /// Pure predicate, exposed for the HTTP/status layer and tests.
    pub fn is_within_group_window(&self, group: &TaskGroup) -> bool {
        match (&group.start_time, &group.end_time) {
            (Some(start), Some(end)) => is_within_window(start, end, &group.timezone, Utc::now()),
            _ => false,
        }
    }

    /// Unregisters any existing start/end jobs for `group_uuid`, then, if
    /// the group is `ACTIVE` with both times set, installs a fresh pair.
    pub async fn install_group_window(self: &Arc<Self>, group: &TaskGroup) -> Result<(), SchedulerError> {
        self.unregister_group_window(group.uuid).await?;

        if group.status != GroupStatus::Active || !group.has_window() {
            return Ok(());
        }
        let (Some(start), Some(end)) = (group.start_time.as_deref(), group.end_time.as_deref()) else {
            return Ok(());
        };

        let Some(start_cron) = daily_utc_cron(start, &group.timezone) else {
            warn!(group_uuid = %group.uuid, "unable to resolve group timezone/start_time, window jobs not installed");
            return Ok(());
        };
        let Some(end_cron) = daily_utc_cron(end, &group.timezone) else {
            warn!(group_uuid = %group.uuid, "unable to resolve group timezone/end_time, window jobs not installed");
            return Ok(());
        };

        let scheduler = self.clone();
        let group_uuid = group.uuid;
        let start_job = Job::new_async(start_cron.as_str(), move |_id, _sched| {
            let scheduler = scheduler.clone();
            Box::pin(async move {
                if let Err(err) = scheduler.start_group(group_uuid).await {
                    warn!(%group_uuid, error = %err, "group start job failed");
                }
            })
        })
        .map_err(|err| SchedulerError::Cron(err.to_string()))?;

        let scheduler = self.clone();
        let end_job = Job::new_async(end_cron.as_str(), move |_id, _sched| {
            let scheduler = scheduler.clone();
            Box::pin(async move {
                if let Err(err) = scheduler.stop_group(group_uuid).await {
                    warn!(%group_uuid, error = %err, "group end job failed");
                }
            })
        })
        .map_err(|err| SchedulerError::Cron(err.to_string()))?;

        let mut cron = self.cron.clone();
        let start_id = cron.add(start_job).await?;
        let end_id = cron.add(end_job).await?;
        self.maps.write().groups.insert(group.uuid, (start_id, end_id));
        Ok(())
    }

    pub async fn unregister_group_window(&self, group_uuid: Uuid) -> Result<(), SchedulerError> {
        let pair = self.maps.write().groups.remove(&group_uuid);
        if let Some((start_id, end_id)) = pair {
            let mut cron = self.cron.clone();
            cron.remove(&start_id).await?;
            cron.remove(&end_id).await?;
        }
        Ok(())
    }

    /// Graceful shutdown: drains the cron engine and clears the maps.
    pub async fn stop(self: Arc<Self>) -> Result<(), SchedulerError> {
        let mut cron = self.cron.clone();
        cron.shutdown().await?;
        self.maps.write().tasks.clear();
        self.maps.write().groups.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::memory::InMemoryRepository;
    use db::models::{CreateProject, CreateTask, CreateTaskGroup, ScheduleConfig, ScheduleType};
    use events::EventBus;
    use execution::{ExecutionRunner, TimerRegistry};

    use super::*;

    async fn test_scheduler() -> (Arc<Scheduler>, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let bus = Arc::new(EventBus::new(128));
        let timers = Arc::new(TimerRegistry::new());
        let runner = Arc::new(ExecutionRunner::new(repo.clone(), bus.clone(), timers));
        let scheduler = Scheduler::new(repo.clone(), bus, runner).await.unwrap();
        (scheduler, repo)
    }

    async fn make_task(repo: &InMemoryRepository, cron: &str, group_id: Option<i64>) -> Task {
        let project = repo
            .create_project(CreateProject {
                name: "p".into(),
                description: None,
                execution_endpoint: Some("http://worker/execute".into()),
                alert_emails: String::new(),
                project_users: vec![],
            })
            .await
            .unwrap();
        repo.create_task(CreateTask {
            project_id: project.id,
            task_group_id: group_id,
            name: "t".into(),
            description: None,
            schedule_type: ScheduleType::Recurring,
            schedule_config: ScheduleConfig {
                cron_expression: Some(cron.to_string()),
                timezone: "UTC".into(),
                ..Default::default()
            },
            timeout_seconds: None,
            metadata: serde_json::Value::Null,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn solo_active_task_registers() {
        let (scheduler, repo) = test_scheduler().await;
        let task = make_task(&repo, "0 * * * * *", None).await;
        assert!(scheduler.register_task(&task).await.unwrap());
    }

    #[tokio::test]
    async fn solo_disabled_task_does_not_register() {
        let (scheduler, repo) = test_scheduler().await;
        let mut task = make_task(&repo, "0 * * * * *", None).await;
        task.status = TaskStatus::Disabled;
        assert!(!scheduler.register_task(&task).await.unwrap());
    }

    #[tokio::test]
    async fn grouped_task_outside_window_does_not_register() {
        let (scheduler, repo) = test_scheduler().await;
        let group = repo
            .create_task_group(CreateTaskGroup {
                project_id: 1,
                name: "g".into(),
                description: None,
                start_time: Some("00:00".into()),
                end_time: Some("00:01".into()),
                timezone: "UTC".into(),
            })
            .await
            .unwrap();
        let task = make_task(&repo, "0 * * * * *", Some(group.id)).await;
        assert!(!scheduler.register_task(&task).await.unwrap());
    }

    #[tokio::test]
    async fn unregister_is_idempotent_for_unknown_task() {
        let (scheduler, _repo) = test_scheduler().await;
        scheduler.unregister_task(uuid::Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_cron_expression_is_skipped_not_errored() {
        let (scheduler, repo) = test_scheduler().await;
        let task = make_task(&repo, "not a cron expression", None).await;
        assert!(!scheduler.register_task(&task).await.unwrap());
    }
}
