pub mod delete_message;
pub mod execution;
pub mod project;
pub mod task;
pub mod task_group;

pub use delete_message::DeleteTaskMessage;
pub use execution::{CreateExecution, Execution, ExecutionStatus, LogEntry, LogLevel, TriggerType};
pub use project::{Project, ProjectRole, ProjectUser};
pub use task::{
    Frequency, FrequencyUnit, ScheduleConfig, ScheduleType, Task, TaskState, TaskStatus, TimeRange,
};
pub use task_group::{GroupState, GroupStatus, TaskGroup};
