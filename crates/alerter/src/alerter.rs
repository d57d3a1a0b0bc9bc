use std::sync::Arc;

use config::AlertingConfig;
use db::repository::Repository;
use events::{DomainEvent, EventBus, Topic};
use tracing::{error, info, warn};

use crate::transport::{EmailTransport, LettreEmailTransport, NoopEmailTransport};

/// Subscribes to [`Topic::ExecutionFailed`] and emails each project's alert
/// recipients when one fires. A timed-out execution is still reported here:
/// the timeout path marks the execution FAILED and publishes
/// `ExecutionFailed` in addition to `ExecutionTimedOut`, so this is the only
/// topic the alerter needs.
///
/// SMTP failures are logged and dropped, never retried: a missed alert email
/// is not worth re-running the whole delivery pipeline for, and the
/// execution row itself is the durable record of the failure.
pub struct Alerter {
    repo: Arc<dyn Repository>,
    transport: Arc<dyn EmailTransport>,
}

impl Alerter {
    pub fn new(repo: Arc<dyn Repository>, transport: Arc<dyn EmailTransport>) -> Arc<Self> {
        Arc::new(Self { repo, transport })
    }

    pub fn from_config(repo: Arc<dyn Repository>, alerting: &AlertingConfig) -> Arc<Self> {
        let transport: Arc<dyn EmailTransport> = if alerting.is_configured() {
            match LettreEmailTransport::new(
                alerting.gmail_user.clone().expect("checked by is_configured"),
                alerting.gmail_app_password.clone().expect("checked by is_configured"),
            ) {
                Ok(t) => Arc::new(t),
                Err(err) => {
                    error!(%err, "failed to build smtp transport, alerting disabled");
                    Arc::new(NoopEmailTransport)
                }
            }
        } else {
            info!("GMAIL_USER/GMAIL_APP_PASSWORD not set, alerting disabled");
            Arc::new(NoopEmailTransport)
        };

        Self::new(repo, transport)
    }

    /// Spawns the subscriber loop on the current Tokio runtime and returns
    /// immediately; the loop runs until `bus` is dropped.
    pub fn spawn(self: &Arc<Self>, bus: &EventBus) {
        let mut failed_rx = bus.subscribe(Topic::ExecutionFailed);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = failed_rx.recv().await {
                this.handle(event).await;
            }
        });
    }

    async fn handle(&self, event: DomainEvent) {
        let (execution, task, reason) = match event {
            DomainEvent::ExecutionFailed { execution, task } => (execution, task, "failed"),
            _ => return,
        };

        let project = match self.repo.get_project_by_id(task.project_id).await {
            Ok(project) => project,
            Err(err) => {
                warn!(%err, task_id = task.id, "could not load project for alert, dropping");
                return;
            }
        };

        let recipients = project.alert_recipients();
        if recipients.is_empty() {
            return;
        }

        let subject = format!("[emerge] task \"{}\" {}", task.name, reason);
        let body = render_body(&project.name, &task, &execution, reason);

        if let Err(err) = self.transport.send(&recipients, &subject, &body).await {
            warn!(%err, task_id = task.id, execution_uuid = %execution.uuid, "failed to send alert email");
        }
    }
}

fn render_body(
    project_name: &str,
    task: &db::models::Task,
    execution: &db::models::Execution,
    reason: &str,
) -> String {
    let error_text = execution.error.as_deref().unwrap_or("(no error message)");
    format!(
        "<h2>Task {reason}</h2>\
         <p><b>Project:</b> {project}</p>\
         <p><b>Task:</b> {task_name} ({task_uuid})</p>\
         <p><b>Execution:</b> {execution_uuid}</p>\
         <p><b>Started:</b> {started_at}</p>\
         <p><b>Error:</b> {error_text}</p>",
        reason = reason,
        project = project_name,
        task_name = task.name,
        task_uuid = task.uuid,
        execution_uuid = execution.uuid,
        started_at = execution.started_at,
        error_text = error_text,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use db::memory::InMemoryRepository;
    use db::models::{CreateProject, CreateTask, ProjectUser, ScheduleConfig, ScheduleType, TriggerType};

    use super::*;
    use crate::error::AlerterError;

    struct RecordingTransport {
        sent: Mutex<Vec<(Vec<String>, String)>>,
    }

    #[async_trait]
    impl EmailTransport for RecordingTransport {
        async fn send(&self, to: &[String], subject: &str, _html_body: &str) -> Result<(), AlerterError> {
            self.sent.lock().unwrap().push((to.to_vec(), subject.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn sends_to_union_of_recipients_on_execution_failed() {
        let repo = Arc::new(InMemoryRepository::new());
        let project = repo
            .create_project(CreateProject {
                name: "acme".into(),
                description: None,
                execution_endpoint: Some("https://example.com/run".into()),
                alert_emails: "ops@acme.com".into(),
                project_users: vec![ProjectUser {
                    email: "owner@acme.com".into(),
                    role: db::models::ProjectRole::Admin,
                }],
            })
            .await
            .unwrap();
        let task = repo
            .create_task(CreateTask {
                project_id: project.id,
                task_group_id: None,
                name: "nightly-sync".into(),
                description: None,
                schedule_type: ScheduleType::Recurring,
                schedule_config: ScheduleConfig::default(),
                timeout_seconds: None,
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();
        let execution = repo
            .create_execution(db::models::CreateExecution {
                task_id: task.id,
                task_uuid: task.uuid,
                trigger_type: TriggerType::Scheduled,
            })
            .await
            .unwrap();

        let repo: Arc<dyn Repository> = repo;
        let transport = Arc::new(RecordingTransport { sent: Mutex::new(Vec::new()) });
        let alerter = Alerter::new(repo, transport.clone());

        alerter
            .handle(DomainEvent::ExecutionFailed { execution, task })
            .await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (recipients, _subject) = &sent[0];
        assert_eq!(recipients, &vec!["ops@acme.com".to_string(), "owner@acme.com".to_string()]
            .into_iter()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn skips_silently_when_no_recipients_configured() {
        let repo = Arc::new(InMemoryRepository::new());
        let project = repo
            .create_project(CreateProject {
                name: "silent".into(),
                description: None,
                execution_endpoint: None,
                alert_emails: "".into(),
                project_users: vec![],
            })
            .await
            .unwrap();
        let task = repo
            .create_task(CreateTask {
                project_id: project.id,
                task_group_id: None,
                name: "t".into(),
                description: None,
                schedule_type: ScheduleType::Recurring,
                schedule_config: ScheduleConfig::default(),
                timeout_seconds: None,
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();
        let execution = repo
            .create_execution(db::models::CreateExecution {
                task_id: task.id,
                task_uuid: task.uuid,
                trigger_type: TriggerType::Scheduled,
            })
            .await
            .unwrap();

        let repo: Arc<dyn Repository> = repo;
        let transport = Arc::new(RecordingTransport { sent: Mutex::new(Vec::new()) });
        let alerter = Alerter::new(repo, transport.clone());

        alerter
            .handle(DomainEvent::ExecutionFailed { execution, task })
            .await;

        assert!(transport.sent.lock().unwrap().is_empty());
    }
}
