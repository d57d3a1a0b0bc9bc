use async_trait::async_trait;
use db::models::DeleteTaskMessage;
use futures::stream::{BoxStream, StreamExt};
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use crate::error::DeleteQueueError;
use crate::queue::{DeleteQueue, Delivery};

struct LapinDelivery {
    message: DeleteTaskMessage,
    inner: lapin::message::Delivery,
}

#[async_trait]
impl Delivery for LapinDelivery {
    fn message(&self) -> &DeleteTaskMessage {
        &self.message
    }

    async fn ack(self: Box<Self>) -> Result<(), DeleteQueueError> {
        self.inner.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn nack(self: Box<Self>, requeue: bool) -> Result<(), DeleteQueueError> {
        self.inner
            .nack(BasicNackOptions {
                requeue,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

/// `lapin`-backed `DeleteQueue` against a durable queue with `prefetch(1)`
/// and manual ack, per the delete-queue wire contract.
pub struct LapinDeleteQueue {
    channel: Channel,
    queue_name: String,
}

impl LapinDeleteQueue {
    pub async fn connect(amqp_url: &str, queue_name: &str) -> Result<Self, DeleteQueueError> {
        let connection = (|| Connection::connect(amqp_url, ConnectionProperties::default()))
            .retry(ExponentialBuilder::default().with_max_times(5))
            .notify(|err, dur| warn!(error = %err, delay = ?dur, "amqp connect failed, retrying"))
            .await?;
        let channel = connection.create_channel().await?;

        channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        channel.basic_qos(1, BasicQosOptions::default()).await?;

        Ok(Self {
            channel,
            queue_name: queue_name.to_string(),
        })
    }
}

#[async_trait]
impl DeleteQueue for LapinDeleteQueue {
    async fn publish(&self, message: DeleteTaskMessage) -> Result<(), DeleteQueueError> {
        let payload = serde_json::to_vec(&message)
            .map_err(|err| DeleteQueueError::Publish(err.to_string()))?;

        self.channel
            .basic_publish(
                "",
                &self.queue_name,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        Ok(())
    }

    async fn consume(&self) -> Result<BoxStream<'static, Box<dyn Delivery>>, DeleteQueueError> {
        let consumer = self
            .channel
            .basic_consume(
                &self.queue_name,
                "task-delete-worker",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let stream = consumer.filter_map(|delivery| async move {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(err) => {
                    warn!(error = %err, "delete queue consumer error");
                    return None;
                }
            };
            match serde_json::from_slice::<DeleteTaskMessage>(&delivery.data) {
                Ok(message) => Some(Box::new(LapinDelivery { message, inner: delivery }) as Box<dyn Delivery>),
                Err(err) => {
                    warn!(error = %err, "malformed delete queue message, dropping");
                    if let Err(nack_err) = delivery.nack(BasicNackOptions::default()).await {
                        warn!(error = %nack_err, "failed to nack malformed delete queue message");
                    }
                    None
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
