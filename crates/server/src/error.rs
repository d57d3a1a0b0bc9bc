use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use db::repository::RepositoryError;
use delete::DeleteQueueError;
use execution::ExecutionError;
use scheduler::SchedulerError;
use thiserror::Error;

use crate::response::ApiResponse;

/// Gathers every crate's leaf error behind one `IntoResponse` impl, per the
/// lineage's `server::error::ApiError` pattern: one status code per variant,
/// body `{"success":false,"error":…}` via [`ApiResponse`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    DeleteQueue(#[from] DeleteQueueError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Repository(RepositoryError::Invalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Repository(RepositoryError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Scheduler(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DeleteQueue(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Execution(ExecutionError::NoExecutionEndpoint) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Execution(ExecutionError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ApiError::Execution(ExecutionError::InvalidStatus(_)) => StatusCode::BAD_REQUEST,
            ApiError::Execution(ExecutionError::Repository(RepositoryError::NotFound)) => StatusCode::NOT_FOUND,
            ApiError::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}
