use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectRole {
    Admin,
    Readonly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectUser {
    pub email: String,
    pub role: ProjectRole,
}

/// Owns tasks, groups, users, execution endpoint, alert recipients, api key.
///
/// `api_key` and `uuid` are immutable once a project is created; nothing in
/// this crate exposes a way to mutate them after `create_project`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub api_key: String,
    pub execution_endpoint: Option<String>,
    pub alert_emails: String,
    pub project_users: Vec<ProjectUser>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// The union of `project_users` emails and the parsed `alert_emails`
    /// list, deduplicated.
    pub fn alert_recipients(&self) -> Vec<String> {
        let mut emails: Vec<String> = self
            .project_users
            .iter()
            .map(|u| u.email.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        emails.extend(
            self.alert_emails
                .split(',')
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
        );

        emails.sort();
        emails.dedup();
        emails
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub execution_endpoint: Option<String>,
    #[serde(default)]
    pub alert_emails: String,
    #[serde(default)]
    pub project_users: Vec<ProjectUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub execution_endpoint: Option<String>,
    #[serde(default)]
    pub alert_emails: Option<String>,
    #[serde(default)]
    pub project_users: Option<Vec<ProjectUser>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(alert_emails: &str, users: Vec<&str>) -> Project {
        Project {
            id: 1,
            uuid: Uuid::new_v4(),
            name: "p".into(),
            description: None,
            api_key: "key".into(),
            execution_endpoint: None,
            alert_emails: alert_emails.into(),
            project_users: users
                .into_iter()
                .map(|e| ProjectUser {
                    email: e.into(),
                    role: ProjectRole::Admin,
                })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn alert_recipients_is_deduplicated_union() {
        let p = project("a@x.com, B@x.com", vec!["b@x.com", "c@x.com"]);
        assert_eq!(
            p.alert_recipients(),
            vec!["a@x.com", "b@x.com", "c@x.com"]
        );
    }

    #[test]
    fn alert_recipients_ignores_blank_entries() {
        let p = project("", vec![]);
        assert!(p.alert_recipients().is_empty());
    }
}
