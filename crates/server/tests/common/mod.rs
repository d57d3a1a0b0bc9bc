use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::Router;
use db::memory::InMemoryRepository;
use db::models::{CreateProject, Project, ProjectUser, ProjectRole};
use delete::{DeleteQueue, DeleteService, InMemoryDeleteQueue};
use events::EventBus;
use execution::{ExecutionCallbacks, ExecutionRunner, TimerRegistry};
use scheduler::Scheduler;
use server::state::AppState;

/// Builds a full `AppState` wired the same way `main.rs` does, but with an
/// `InMemoryDeleteQueue` in place of `LapinDeleteQueue` so tests never touch
/// a real broker.
pub async fn build_state() -> (AppState, Arc<InMemoryDeleteQueue>) {
    let repo = Arc::new(InMemoryRepository::new()) as Arc<dyn db::Repository>;
    let bus = Arc::new(EventBus::new(128));
    let timers = Arc::new(TimerRegistry::default());
    let runner = Arc::new(ExecutionRunner::new(repo.clone(), bus.clone(), timers.clone()));
    let callbacks = Arc::new(ExecutionCallbacks::new(repo.clone(), bus.clone(), timers.clone()));

    let scheduler = Scheduler::new(repo.clone(), bus.clone(), runner.clone())
        .await
        .expect("scheduler starts");

    let queue = Arc::new(InMemoryDeleteQueue::new(16));
    let delete_service = Arc::new(DeleteService::new(
        repo.clone(),
        bus.clone(),
        queue.clone() as Arc<dyn DeleteQueue>,
        scheduler.clone(),
    ));

    let state = AppState {
        repo,
        bus,
        scheduler,
        runner,
        callbacks,
        delete_service,
    };
    (state, queue)
}

pub fn router(state: AppState) -> Router {
    server::routes::router(state)
}

static PROJECT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Each call gets a distinct project name — `InMemoryRepository` rejects
/// duplicate (case-insensitive) names, and several tests create more than
/// one project per run.
pub async fn create_project(state: &AppState, execution_endpoint: Option<String>) -> Project {
    let n = PROJECT_SEQ.fetch_add(1, Ordering::SeqCst);
    state
        .repo
        .create_project(CreateProject {
            name: format!("acme-{n}"),
            description: None,
            execution_endpoint,
            alert_emails: "ops@acme.com".into(),
            project_users: vec![ProjectUser {
                email: "owner@acme.com".into(),
                role: ProjectRole::Admin,
            }],
        })
        .await
        .expect("project created")
}
