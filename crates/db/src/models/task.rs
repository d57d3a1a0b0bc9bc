use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    Recurring,
    Oneoff,
}

/// `PendingDelete` and `DeleteFailed` are backend-only: client PATCH/POST
/// bodies accept only `Active`/`Disabled` (enforced in the HTTP layer, not
/// here, since this is a data-model invariant rather than a storage one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Active,
    Disabled,
    PendingDelete,
    DeleteFailed,
}

impl TaskStatus {
    pub fn is_client_settable(self) -> bool {
        matches!(self, TaskStatus::Active | TaskStatus::Disabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Running,
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FrequencyUnit {
    S,
    M,
    H,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Frequency {
    pub value: u32,
    pub unit: FrequencyUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScheduleConfig {
    pub cron_expression: Option<String>,
    pub timezone: String,
    pub time_range: Option<TimeRange>,
    pub days_of_week: Option<Vec<u8>>,
    pub exclusions: Option<Vec<u8>>,
}

impl ScheduleConfig {
    /// `days_of_week`/`exclusions` values must be in `0..=6`; anything else
    /// is rejected.
    pub fn validate(&self) -> Result<(), String> {
        let in_range = |xs: &Option<Vec<u8>>| xs.as_ref().is_none_or(|v| v.iter().all(|d| *d <= 6));
        if !in_range(&self.days_of_week) {
            return Err("days_of_week values must be in 0..=6".to_string());
        }
        if !in_range(&self.exclusions) {
            return Err("exclusions values must be in 0..=6".to_string());
        }
        Ok(())
    }
}

/// A scheduled unit of work executed externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub uuid: Uuid,
    pub project_id: i64,
    pub task_group_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub schedule_type: ScheduleType,
    pub status: TaskStatus,
    pub state: TaskState,
    pub schedule_config: ScheduleConfig,
    pub timeout_seconds: Option<u64>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn has_cron(&self) -> bool {
        self.schedule_config
            .cron_expression
            .as_ref()
            .is_some_and(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    #[serde(skip)]
    pub project_id: i64,
    pub task_group_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub schedule_type: ScheduleType,
    #[serde(default)]
    pub schedule_config: ScheduleConfig,
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    #[serde(default)]
    pub task_group_id: Option<Option<i64>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub schedule_config: Option<ScheduleConfig>,
    #[serde(default)]
    pub timeout_seconds: Option<Option<u64>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_days() {
        let cfg = ScheduleConfig {
            days_of_week: Some(vec![0, 6, 7]),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_full_week() {
        let cfg = ScheduleConfig {
            days_of_week: Some(vec![0, 1, 2, 3, 4, 5, 6]),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
