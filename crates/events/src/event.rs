use db::models::{Execution, Task, TaskGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskGroupCreated,
    TaskGroupUpdated,
    TaskGroupDeleted,
    ExecutionFailed,
    ExecutionTimedOut,
}

/// One variant per [`Topic`], each carrying its own typed payload rather
/// than a `serde_json::Value` grab-bag — subscribers match on the variant
/// they care about instead of parsing an envelope.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    TaskCreated(Task),
    TaskUpdated(Task),
    /// Published by the delete worker *after* the hard delete, so this is
    /// the only variant with just a uuid/project_id rather than a full row.
    TaskDeleted { task_uuid: uuid::Uuid, project_id: i64 },
    TaskGroupCreated(TaskGroup),
    TaskGroupUpdated(TaskGroup),
    TaskGroupDeleted { group_uuid: uuid::Uuid, project_id: i64 },
    ExecutionFailed { execution: Execution, task: Task },
    ExecutionTimedOut { execution: Execution, task: Task },
}

impl DomainEvent {
    pub fn topic(&self) -> Topic {
        match self {
            DomainEvent::TaskCreated(_) => Topic::TaskCreated,
            DomainEvent::TaskUpdated(_) => Topic::TaskUpdated,
            DomainEvent::TaskDeleted { .. } => Topic::TaskDeleted,
            DomainEvent::TaskGroupCreated(_) => Topic::TaskGroupCreated,
            DomainEvent::TaskGroupUpdated(_) => Topic::TaskGroupUpdated,
            DomainEvent::TaskGroupDeleted { .. } => Topic::TaskGroupDeleted,
            DomainEvent::ExecutionFailed { .. } => Topic::ExecutionFailed,
            DomainEvent::ExecutionTimedOut { .. } => Topic::ExecutionTimedOut,
        }
    }
}
