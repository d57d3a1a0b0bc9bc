use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    Active,
    Disabled,
}

/// System-controlled runtime eligibility; never set directly by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupState {
    Running,
    NotRunning,
}

/// A bundle of tasks sharing a daily time window.
///
/// If either `start_time` or `end_time` is absent the group has no window
/// and never transitions to `Running` by time alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGroup {
    pub id: i64,
    pub uuid: Uuid,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: GroupStatus,
    pub state: GroupState,
    /// "HH:MM" in `timezone`.
    pub start_time: Option<String>,
    /// "HH:MM" in `timezone`.
    pub end_time: Option<String>,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskGroup {
    pub fn has_window(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskGroup {
    #[serde(skip)]
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub timezone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<GroupStatus>,
    #[serde(default)]
    pub start_time: Option<Option<String>>,
    #[serde(default)]
    pub end_time: Option<Option<String>>,
    #[serde(default)]
    pub timezone: Option<String>,
}
