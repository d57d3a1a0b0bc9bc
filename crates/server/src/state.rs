use std::sync::Arc;

use db::Repository;
use delete::DeleteService;
use events::EventBus;
use execution::{ExecutionCallbacks, ExecutionRunner};
use scheduler::Scheduler;

/// Shared handles every route needs, cloned cheaply (everything inside is
/// already `Arc`-wrapped) per axum's `State` extractor convention.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub bus: Arc<EventBus>,
    pub scheduler: Arc<Scheduler>,
    pub runner: Arc<ExecutionRunner>,
    pub callbacks: Arc<ExecutionCallbacks>,
    pub delete_service: Arc<DeleteService>,
}
