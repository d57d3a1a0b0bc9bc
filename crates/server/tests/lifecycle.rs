mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use db::models::{ExecutionStatus, ScheduleType, TaskStatus};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A manually triggered task dispatches to its project's execution
/// endpoint, and a worker status callback brings the resulting execution
/// to a terminal state.
#[tokio::test]
async fn active_solo_task_fires_and_worker_callback_completes_it() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (state, _queue) = common::build_state().await;
    let project = common::create_project(&state, Some(format!("{}/run", mock_server.uri()))).await;

    let task = state
        .repo
        .create_task(db::models::CreateTask {
            project_id: project.id,
            task_group_id: None,
            name: "nightly-sync".into(),
            description: None,
            schedule_type: ScheduleType::Oneoff,
            schedule_config: Default::default(),
            timeout_seconds: None,
            metadata: Value::Null,
        })
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Active);

    let app = common::router(state.clone());
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/tasks/{}/trigger", task.uuid))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    let execution_uuid = body["data"]["uuid"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "PENDING");

    // Worker reports success via the callback surface, authenticated with
    // the project's api_key.
    let app = common::router(state.clone());
    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/api/executions/{execution_uuid}/status"))
        .header("Authorization", &project.api_key)
        .header("content-type", "application/json")
        .body(Body::from(json!({"status": "SUCCESS"}).to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = state
        .repo
        .get_execution_by_uuid(execution_uuid.parse().unwrap())
        .await
        .unwrap();
    assert_eq!(stored.status, ExecutionStatus::Success);
}

/// A worker callback bearing a different project's api_key is rejected
/// even when the execution uuid is valid.
#[tokio::test]
async fn worker_callback_rejects_mismatched_project_api_key() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (state, _queue) = common::build_state().await;
    let project = common::create_project(&state, Some(format!("{}/run", mock_server.uri()))).await;
    let other_project = common::create_project(&state, None).await;

    let task = state
        .repo
        .create_task(db::models::CreateTask {
            project_id: project.id,
            task_group_id: None,
            name: "t".into(),
            description: None,
            schedule_type: ScheduleType::Oneoff,
            schedule_config: Default::default(),
            timeout_seconds: None,
            metadata: Value::Null,
        })
        .await
        .unwrap();

    let execution = state.runner.fire(task, db::models::TriggerType::Manual).await.unwrap();

    let app = common::router(state.clone());
    let req = Request::builder()
        .method("PATCH")
        .uri(format!("/api/executions/{}/status", execution.uuid))
        .header("Authorization", &other_project.api_key)
        .header("content-type", "application/json")
        .body(Body::from(json!({"status": "SUCCESS"}).to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
