use async_trait::async_trait;
use db::models::DeleteTaskMessage;
use futures::stream::BoxStream;

use crate::error::DeleteQueueError;

/// One delivered message plus its manual ack/nack handle. Consuming the
/// handle (`self: Box<Self>`) makes acking or nacking a one-shot action,
/// mirroring the broker's own semantics.
#[async_trait]
pub trait Delivery: Send {
    fn message(&self) -> &DeleteTaskMessage;
    async fn ack(self: Box<Self>) -> Result<(), DeleteQueueError>;
    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), DeleteQueueError>;
}

/// Broker-agnostic publish/consume contract for the deletion pipeline.
/// [`crate::LapinDeleteQueue`] is the production implementation;
/// [`crate::InMemoryDeleteQueue`] backs tests without a live broker.
#[async_trait]
pub trait DeleteQueue: Send + Sync {
    async fn publish(&self, message: DeleteTaskMessage) -> Result<(), DeleteQueueError>;

    /// May be called at most once per queue instance; a second call
    /// returns `AlreadyConsuming`.
    async fn consume(&self) -> Result<BoxStream<'static, Box<dyn Delivery>>, DeleteQueueError>;
}
