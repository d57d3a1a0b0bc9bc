use db::repository::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("project has no execution_endpoint configured")]
    NoExecutionEndpoint,
    #[error("dispatch request failed: {0}")]
    Dispatch(#[from] reqwest::Error),
    #[error("invalid status value: {0}")]
    InvalidStatus(String),
    #[error("execution {0} does not belong to the authenticated project")]
    Forbidden(uuid::Uuid),
}
