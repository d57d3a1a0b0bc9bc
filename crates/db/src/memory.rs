use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        execution::{CreateExecution, Execution, ExecutionStatus, LogEntry},
        project::{CreateProject, Project, UpdateProject},
        task::{CreateTask, Task, TaskState, TaskStatus, UpdateTask},
        task_group::{CreateTaskGroup, GroupState, GroupStatus, TaskGroup, UpdateTaskGroup},
    },
    repository::{ExecutionPage, Repository, RepositoryError, Result},
};

#[derive(Default)]
struct State {
    next_id: i64,
    projects: HashMap<i64, Project>,
    project_uuids: HashMap<Uuid, i64>,
    groups: HashMap<i64, TaskGroup>,
    group_uuids: HashMap<Uuid, i64>,
    tasks: HashMap<i64, Task>,
    task_uuids: HashMap<Uuid, i64>,
    executions: HashMap<i64, Execution>,
    execution_uuids: HashMap<Uuid, i64>,
}

impl State {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Reference [`Repository`] backed by in-process maps, guarded by a single
/// `parking_lot::RwLock`. Stands in for a persistent document store; every
/// other crate is written against the `Repository` trait, not against this
/// struct.
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_project(&self, input: CreateProject) -> Result<Project> {
        let mut state = self.state.write();
        if state
            .projects
            .values()
            .any(|p| p.name.eq_ignore_ascii_case(input.name.trim()))
        {
            return Err(RepositoryError::Conflict(format!(
                "project name '{}' already exists",
                input.name
            )));
        }
        let id = state.alloc_id();
        let uuid = Uuid::new_v4();
        let now = Utc::now();
        let project = Project {
            id,
            uuid,
            name: input.name.trim().to_string(),
            description: input.description,
            api_key: Uuid::new_v4().to_string(),
            execution_endpoint: input.execution_endpoint,
            alert_emails: input.alert_emails,
            project_users: input.project_users,
            created_at: now,
            updated_at: now,
        };
        state.project_uuids.insert(uuid, id);
        state.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn get_project_by_id(&self, id: i64) -> Result<Project> {
        self.state
            .read()
            .projects
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_project_by_uuid(&self, uuid: Uuid) -> Result<Project> {
        let state = self.state.read();
        let id = state.project_uuids.get(&uuid).ok_or(RepositoryError::NotFound)?;
        state.projects.get(id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn get_project_by_api_key(&self, api_key: &str) -> Result<Project> {
        self.state
            .read()
            .projects
            .values()
            .find(|p| p.api_key == api_key)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_project(&self, id: i64, update: UpdateProject) -> Result<Project> {
        let mut state = self.state.write();
        let project = state.projects.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(name) = update.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            project.description = Some(description);
        }
        if let Some(endpoint) = update.execution_endpoint {
            project.execution_endpoint = Some(endpoint);
        }
        if let Some(emails) = update.alert_emails {
            project.alert_emails = emails;
        }
        if let Some(users) = update.project_users {
            project.project_users = users;
        }
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn create_task_group(&self, input: CreateTaskGroup) -> Result<TaskGroup> {
        let mut state = self.state.write();
        let id = state.alloc_id();
        let uuid = Uuid::new_v4();
        let now = Utc::now();
        let group = TaskGroup {
            id,
            uuid,
            project_id: input.project_id,
            name: input.name,
            description: input.description,
            status: GroupStatus::Active,
            state: GroupState::NotRunning,
            start_time: input.start_time,
            end_time: input.end_time,
            timezone: input.timezone,
            created_at: now,
            updated_at: now,
        };
        state.group_uuids.insert(uuid, id);
        state.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn get_task_group_by_id(&self, id: i64) -> Result<TaskGroup> {
        self.state.read().groups.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn get_task_group_by_uuid(&self, uuid: Uuid) -> Result<TaskGroup> {
        let state = self.state.read();
        let id = state.group_uuids.get(&uuid).ok_or(RepositoryError::NotFound)?;
        state.groups.get(id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn list_task_groups_by_project(&self, project_id: i64) -> Result<Vec<TaskGroup>> {
        Ok(self
            .state
            .read()
            .groups
            .values()
            .filter(|g| g.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_active_windowed_groups(&self) -> Result<Vec<TaskGroup>> {
        Ok(self
            .state
            .read()
            .groups
            .values()
            .filter(|g| g.status == GroupStatus::Active && g.has_window())
            .cloned()
            .collect())
    }

    async fn update_task_group(&self, id: i64, update: UpdateTaskGroup) -> Result<TaskGroup> {
        let mut state = self.state.write();
        let group = state.groups.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(name) = update.name {
            group.name = name;
        }
        if let Some(description) = update.description {
            group.description = Some(description);
        }
        if let Some(status) = update.status {
            group.status = status;
            if status == GroupStatus::Disabled {
                group.state = GroupState::NotRunning;
            }
        }
        if let Some(start) = update.start_time {
            group.start_time = start;
        }
        if let Some(end) = update.end_time {
            group.end_time = end;
        }
        if let Some(tz) = update.timezone {
            group.timezone = tz;
        }
        group.updated_at = Utc::now();
        Ok(group.clone())
    }

    async fn update_task_group_state(&self, id: i64, state: GroupState) -> Result<()> {
        let mut s = self.state.write();
        let group = s.groups.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        group.state = state;
        group.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_task_group(&self, id: i64) -> Result<()> {
        let mut state = self.state.write();
        if state.groups.remove(&id).is_none() {
            return Ok(());
        }
        state.group_uuids.retain(|_, v| *v != id);

        let affected: Vec<i64> = state
            .tasks
            .values()
            .filter(|t| t.task_group_id == Some(id))
            .map(|t| t.id)
            .collect();
        for task_id in affected {
            if let Some(task) = state.tasks.get_mut(&task_id) {
                task.task_group_id = None;
                task.state = if task.status == TaskStatus::Active {
                    TaskState::Running
                } else {
                    TaskState::NotRunning
                };
                task.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn create_task(&self, input: CreateTask) -> Result<Task> {
        let mut state = self.state.write();
        let id = state.alloc_id();
        let uuid = Uuid::new_v4();
        let now = Utc::now();
        let task = Task {
            id,
            uuid,
            project_id: input.project_id,
            task_group_id: input.task_group_id,
            name: input.name,
            description: input.description,
            schedule_type: input.schedule_type,
            status: TaskStatus::Active,
            state: if input.task_group_id.is_none() {
                TaskState::Running
            } else {
                TaskState::NotRunning
            },
            schedule_config: input.schedule_config,
            timeout_seconds: input.timeout_seconds,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        };
        state.task_uuids.insert(uuid, id);
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn get_task_by_id(&self, id: i64) -> Result<Task> {
        self.state.read().tasks.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn get_task_by_uuid(&self, uuid: Uuid) -> Result<Task> {
        let state = self.state.read();
        let id = state.task_uuids.get(&uuid).ok_or(RepositoryError::NotFound)?;
        state.tasks.get(id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn list_tasks_by_project(&self, project_id: i64) -> Result<Vec<Task>> {
        Ok(self
            .state
            .read()
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_tasks_by_group(&self, group_id: i64) -> Result<Vec<Task>> {
        Ok(self
            .state
            .read()
            .tasks
            .values()
            .filter(|t| t.task_group_id == Some(group_id))
            .cloned()
            .collect())
    }

    async fn list_tasks_by_status(&self, statuses: &[TaskStatus]) -> Result<Vec<Task>> {
        Ok(self
            .state
            .read()
            .tasks
            .values()
            .filter(|t| statuses.contains(&t.status))
            .cloned()
            .collect())
    }

    async fn list_cron_eligible_tasks(&self) -> Result<Vec<Task>> {
        Ok(self
            .state
            .read()
            .tasks
            .values()
            .filter(|t| t.has_cron())
            .cloned()
            .collect())
    }

    async fn update_task(&self, id: i64, update: UpdateTask) -> Result<Task> {
        let mut state = self.state.write();
        let task = state.tasks.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(group_id) = update.task_group_id {
            task.task_group_id = group_id;
        }
        if let Some(name) = update.name {
            task.name = name;
        }
        if let Some(description) = update.description {
            task.description = Some(description);
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(cfg) = update.schedule_config {
            task.schedule_config = cfg;
        }
        if let Some(timeout) = update.timeout_seconds {
            task.timeout_seconds = timeout;
        }
        if let Some(metadata) = update.metadata {
            task.metadata = metadata;
        }
        if task.task_group_id.is_none() {
            task.state = if task.status == TaskStatus::Active {
                TaskState::Running
            } else {
                TaskState::NotRunning
            };
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn update_task_status(&self, id: i64, status: TaskStatus) -> Result<Task> {
        let mut state = self.state.write();
        let task = state.tasks.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        task.status = status;
        if task.task_group_id.is_none() {
            task.state = if status == TaskStatus::Active {
                TaskState::Running
            } else {
                TaskState::NotRunning
            };
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn update_task_state(&self, id: i64, state: TaskState) -> Result<()> {
        let mut s = self.state.write();
        let task = s.tasks.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        task.state = state;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn hard_delete_task(&self, uuid: Uuid) -> Result<()> {
        let mut state = self.state.write();
        if let Some(id) = state.task_uuids.remove(&uuid) {
            state.tasks.remove(&id);
        }
        Ok(())
    }

    async fn create_execution(&self, input: CreateExecution) -> Result<Execution> {
        let mut state = self.state.write();
        let id = state.alloc_id();
        let uuid = Uuid::new_v4();
        let now = Utc::now();
        let execution = Execution {
            id,
            uuid,
            task_id: input.task_id,
            task_uuid: input.task_uuid,
            status: ExecutionStatus::Pending,
            started_at: now,
            ended_at: None,
            error: None,
            logs: Vec::new(),
            trigger_type: input.trigger_type,
            created_at: now,
            updated_at: now,
        };
        state.execution_uuids.insert(uuid, id);
        state.executions.insert(id, execution.clone());
        Ok(execution)
    }

    async fn get_execution_by_uuid(&self, uuid: Uuid) -> Result<Execution> {
        let state = self.state.read();
        let id = state.execution_uuids.get(&uuid).ok_or(RepositoryError::NotFound)?;
        state.executions.get(id).cloned().ok_or(RepositoryError::NotFound)
    }

    async fn update_execution_status(
        &self,
        uuid: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
    ) -> Result<Execution> {
        let mut state = self.state.write();
        let id = *state.execution_uuids.get(&uuid).ok_or(RepositoryError::NotFound)?;
        let execution = state.executions.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        execution.status = status;
        if error.is_some() {
            execution.error = error;
        }
        if status.is_terminal() {
            execution.ended_at = Some(Utc::now());
        }
        execution.updated_at = Utc::now();
        Ok(execution.clone())
    }

    async fn append_execution_log(&self, uuid: Uuid, entry: LogEntry) -> Result<()> {
        let mut state = self.state.write();
        let id = *state.execution_uuids.get(&uuid).ok_or(RepositoryError::NotFound)?;
        let execution = state.executions.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        execution.logs.push(entry);
        execution.updated_at = Utc::now();
        Ok(())
    }

    async fn list_executions_by_task_paginated(
        &self,
        task_id: i64,
        day: NaiveDate,
        page: u32,
        page_size: u32,
    ) -> Result<ExecutionPage> {
        let page_size = page_size.min(100).max(1);
        let state = self.state.read();
        let mut matching: Vec<Execution> = state
            .executions
            .values()
            .filter(|e| e.task_id == task_id && e.started_at.date_naive() == day)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.started_at);

        let total = matching.len() as u64;
        let start = (page.saturating_sub(1) as usize) * page_size as usize;
        let items = matching.into_iter().skip(start).take(page_size as usize).collect();
        Ok(ExecutionPage { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{execution::TriggerType, project::ProjectUser, task::ScheduleType};

    fn repo() -> InMemoryRepository {
        InMemoryRepository::new()
    }

    async fn make_project(repo: &InMemoryRepository) -> Project {
        repo.create_project(CreateProject {
            name: "Acme".into(),
            description: None,
            execution_endpoint: Some("http://worker/execute".into()),
            alert_emails: "ops@acme.test".into(),
            project_users: vec![ProjectUser {
                email: "owner@acme.test".into(),
                role: crate::models::project::ProjectRole::Admin,
            }],
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_project_name_is_rejected_case_insensitively() {
        let repo = repo();
        make_project(&repo).await;
        let err = repo
            .create_project(CreateProject {
                name: "acme".into(),
                description: None,
                execution_endpoint: None,
                alert_emails: String::new(),
                project_users: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn hard_delete_task_is_idempotent() {
        let repo = repo();
        let project = make_project(&repo).await;
        let task = repo
            .create_task(CreateTask {
                project_id: project.id,
                task_group_id: None,
                name: "t".into(),
                description: None,
                schedule_type: ScheduleType::Recurring,
                schedule_config: Default::default(),
                timeout_seconds: None,
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();

        repo.hard_delete_task(task.uuid).await.unwrap();
        repo.hard_delete_task(task.uuid).await.unwrap();
        assert!(matches!(
            repo.get_task_by_uuid(task.uuid).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleting_group_ungroups_without_deleting_tasks() {
        let repo = repo();
        let project = make_project(&repo).await;
        let group = repo
            .create_task_group(CreateTaskGroup {
                project_id: project.id,
                name: "g".into(),
                description: None,
                start_time: Some("09:00".into()),
                end_time: Some("17:00".into()),
                timezone: "UTC".into(),
            })
            .await
            .unwrap();
        let task = repo
            .create_task(CreateTask {
                project_id: project.id,
                task_group_id: Some(group.id),
                name: "t".into(),
                description: None,
                schedule_type: ScheduleType::Recurring,
                schedule_config: Default::default(),
                timeout_seconds: None,
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();

        repo.delete_task_group(group.id).await.unwrap();

        let reloaded = repo.get_task_by_uuid(task.uuid).await.unwrap();
        assert_eq!(reloaded.task_group_id, None);
        assert_eq!(reloaded.state, TaskState::Running);
        assert!(matches!(
            repo.get_task_group_by_id(group.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn execution_pagination_caps_at_requested_day() {
        let repo = repo();
        let project = make_project(&repo).await;
        let task = repo
            .create_task(CreateTask {
                project_id: project.id,
                task_group_id: None,
                name: "t".into(),
                description: None,
                schedule_type: ScheduleType::Recurring,
                schedule_config: Default::default(),
                timeout_seconds: None,
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();

        for _ in 0..3 {
            repo.create_execution(CreateExecution {
                task_id: task.id,
                task_uuid: task.uuid,
                trigger_type: TriggerType::Scheduled,
            })
            .await
            .unwrap();
        }

        let today = Utc::now().date_naive();
        let page = repo
            .list_executions_by_task_paginated(task.id, today, 1, 2)
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
    }
}
