use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod executions;
mod health;
mod projects;
mod task_groups;
mod tasks;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", axum::routing::get(health::health_check))
        .merge(projects::router())
        .merge(task_groups::router())
        .merge(tasks::router())
        .merge(executions::router());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
