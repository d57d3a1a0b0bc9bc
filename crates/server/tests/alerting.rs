mod common;

use std::sync::Mutex;
use std::time::Duration;

use alerter::{Alerter, EmailTransport};
use async_trait::async_trait;
use db::models::{CreateTask, ScheduleType};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct RecordingTransport {
    sent: Mutex<Vec<(Vec<String>, String)>>,
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn send(&self, to: &[String], subject: &str, _html_body: &str) -> Result<(), alerter::AlerterError> {
        self.sent.lock().unwrap().push((to.to_vec(), subject.to_string()));
        Ok(())
    }
}

/// A dispatched execution that never gets a worker callback before its
/// `timeout_seconds` elapses is marked FAILED, fires `ExecutionTimedOut` then
/// `ExecutionFailed`, and the alerter emails the project's recipients — end
/// to end, with no SMTP server running (the recording transport stands in
/// for `lettre`).
#[tokio::test]
async fn execution_timeout_produces_alert_email() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (state, _queue) = common::build_state().await;
    let project = common::create_project(&state, Some(format!("{}/run", mock_server.uri()))).await;

    let transport = std::sync::Arc::new(RecordingTransport { sent: Mutex::new(Vec::new()) });
    let alerter = Alerter::new(state.repo.clone(), transport.clone());
    alerter.spawn(&state.bus);

    let task = state
        .repo
        .create_task(CreateTask {
            project_id: project.id,
            task_group_id: None,
            name: "slow-task".into(),
            description: None,
            schedule_type: ScheduleType::Oneoff,
            schedule_config: Default::default(),
            timeout_seconds: Some(1),
            metadata: Value::Null,
        })
        .await
        .unwrap();

    // Dispatch succeeds (the mock responds 200) but no worker callback ever
    // arrives, so the armed timeout fires after ~1s.
    state.runner.fire(task, db::models::TriggerType::Manual).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (recipients, subject) = &sent[0];
    assert!(recipients.contains(&"ops@acme.com".to_string()));
    assert!(recipients.contains(&"owner@acme.com".to_string()));
    assert!(subject.contains("failed"));
}
