use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::trace;

use crate::event::{DomainEvent, Topic};

/// Fire-and-forget pub/sub for domain events, one bounded `mpsc` channel per
/// subscriber per topic. There is no replay buffer: a subscriber only sees
/// events published after it calls `subscribe`.
///
/// Mirrors a broadcast-channel fan-out, but uses per-subscriber `mpsc`
/// queues instead of one shared `broadcast` channel so that a slow
/// subscriber drops *its own* backlog (`try_send` + ignore `Full`) without
/// stalling or disconnecting any other subscriber.
pub struct EventBus {
    buffer: usize,
    subscribers: RwLock<HashMap<Topic, Vec<mpsc::Sender<DomainEvent>>>>,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer,
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, topic: Topic) -> mpsc::Receiver<DomainEvent> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.write().entry(topic).or_default().push(tx);
        rx
    }

    /// Sends `event` to every current subscriber of its topic. A full
    /// subscriber channel silently drops the event for that subscriber only;
    /// a closed one is pruned lazily on the next publish to that topic.
    pub fn publish(&self, event: DomainEvent) {
        let topic = event.topic();
        let mut subscribers = self.subscribers.write();
        let Some(senders) = subscribers.get_mut(&topic) else {
            return;
        };

        senders.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!(?topic, "event bus subscriber buffer full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use db::models::{ScheduleType, Task, TaskState, TaskStatus};
    use uuid::Uuid;

    use super::*;

    fn sample_task() -> Task {
        Task {
            id: 1,
            uuid: Uuid::new_v4(),
            project_id: 1,
            task_group_id: None,
            name: "t".into(),
            description: None,
            schedule_type: ScheduleType::Recurring,
            status: TaskStatus::Active,
            state: TaskState::NotRunning,
            schedule_config: Default::default(),
            timeout_seconds: None,
            metadata: serde_json::Value::Null,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event_on_matching_topic() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe(Topic::TaskCreated);
        bus.publish(DomainEvent::TaskCreated(sample_task()));
        let received = rx.recv().await.expect("event delivered");
        assert!(matches!(received, DomainEvent::TaskCreated(_)));
    }

    #[tokio::test]
    async fn full_buffer_drops_without_blocking_other_subscribers() {
        let bus = EventBus::new(1);
        let mut slow = bus.subscribe(Topic::TaskCreated);
        let mut fast = bus.subscribe(Topic::TaskCreated);

        bus.publish(DomainEvent::TaskCreated(sample_task()));
        bus.publish(DomainEvent::TaskCreated(sample_task()));

        assert!(slow.recv().await.is_some());
        assert!(fast.recv().await.is_some());
    }

    #[tokio::test]
    async fn closed_subscriber_is_pruned_on_next_publish() {
        let bus = EventBus::new(4);
        let rx = bus.subscribe(Topic::TaskDeleted);
        drop(rx);

        bus.publish(DomainEvent::TaskDeleted {
            task_uuid: Uuid::new_v4(),
            project_id: 1,
        });
        assert_eq!(bus.subscribers.read().get(&Topic::TaskDeleted).unwrap().len(), 0);
    }
}
