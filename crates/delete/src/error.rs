use db::repository::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeleteQueueError {
    #[error("delete queue publish failed: {0}")]
    Publish(String),
    #[error("delete queue consume failed: {0}")]
    Consume(String),
    #[error("delete queue channel closed")]
    Closed,
    #[error("consume() already called on this queue")]
    AlreadyConsuming,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Broker(#[from] lapin::Error),
}
