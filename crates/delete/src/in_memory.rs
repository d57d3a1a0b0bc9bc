use async_trait::async_trait;
use db::models::DeleteTaskMessage;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::DeleteQueueError;
use crate::queue::{DeleteQueue, Delivery};

struct InMemoryDelivery {
    message: DeleteTaskMessage,
    requeue: mpsc::Sender<DeleteTaskMessage>,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn message(&self) -> &DeleteTaskMessage {
        &self.message
    }

    async fn ack(self: Box<Self>) -> Result<(), DeleteQueueError> {
        Ok(())
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), DeleteQueueError> {
        if requeue {
            self.requeue
                .send(self.message.clone())
                .await
                .map_err(|_| DeleteQueueError::Closed)?;
        }
        Ok(())
    }
}

/// Test double for [`DeleteQueue`]: a bounded `mpsc` channel standing in
/// for the broker, the same way `InMemoryRepository` stands in for the
/// document store.
pub struct InMemoryDeleteQueue {
    tx: mpsc::Sender<DeleteTaskMessage>,
    rx: Mutex<Option<mpsc::Receiver<DeleteTaskMessage>>>,
}

impl InMemoryDeleteQueue {
    pub fn new(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }
}

#[async_trait]
impl DeleteQueue for InMemoryDeleteQueue {
    async fn publish(&self, message: DeleteTaskMessage) -> Result<(), DeleteQueueError> {
        self.tx.send(message).await.map_err(|_| DeleteQueueError::Closed)
    }

    async fn consume(&self) -> Result<BoxStream<'static, Box<dyn Delivery>>, DeleteQueueError> {
        let rx = self.rx.lock().take().ok_or(DeleteQueueError::AlreadyConsuming)?;
        let requeue = self.tx.clone();
        let stream = ReceiverStream::new(rx).map(move |message| {
            Box::new(InMemoryDelivery {
                message,
                requeue: requeue.clone(),
            }) as Box<dyn Delivery>
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample() -> DeleteTaskMessage {
        DeleteTaskMessage {
            task_uuid: Uuid::new_v4(),
            project_id: 1,
            requested_at: Utc::now(),
            request_id: None,
        }
    }

    #[tokio::test]
    async fn published_message_is_delivered_and_ackable() {
        let queue = InMemoryDeleteQueue::new(4);
        queue.publish(sample()).await.unwrap();

        let mut stream = queue.consume().await.unwrap();
        let delivery = stream.next().await.expect("delivery");
        let msg = delivery.message().clone();
        delivery.ack().await.unwrap();
        assert_eq!(msg.project_id, 1);
    }

    #[tokio::test]
    async fn nack_with_requeue_redelivers() {
        let queue = InMemoryDeleteQueue::new(4);
        let message = sample();
        queue.publish(message.clone()).await.unwrap();

        let mut stream = queue.consume().await.unwrap();
        let delivery = stream.next().await.expect("delivery");
        delivery.nack(true).await.unwrap();

        let redelivered = stream.next().await.expect("redelivered");
        assert_eq!(redelivered.message().task_uuid, message.task_uuid);
    }

    #[tokio::test]
    async fn second_consume_call_is_rejected() {
        let queue = InMemoryDeleteQueue::new(4);
        let _stream = queue.consume().await.unwrap();
        assert!(matches!(queue.consume().await, Err(DeleteQueueError::AlreadyConsuming)));
    }
}
