use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// In-flight only — never persisted beyond the broker queue. `project_id`
/// travels on the wire as a string, matching the broker message contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTaskMessage {
    pub task_uuid: Uuid,
    #[serde(with = "project_id_as_string")]
    pub project_id: i64,
    pub requested_at: DateTime<Utc>,
    pub request_id: Option<String>,
}

mod project_id_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl DeleteTaskMessage {
    pub fn new(task_uuid: Uuid, project_id: i64) -> Self {
        Self {
            task_uuid,
            project_id,
            requested_at: Utc::now(),
            request_id: None,
        }
    }
}
