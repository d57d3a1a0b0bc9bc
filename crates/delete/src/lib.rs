mod error;
mod in_memory;
mod lapin_queue;
mod queue;
mod reconciler;
mod service;

pub use error::DeleteQueueError;
pub use in_memory::InMemoryDeleteQueue;
pub use lapin_queue::LapinDeleteQueue;
pub use queue::{DeleteQueue, Delivery};
pub use reconciler::Reconciler;
pub use service::{DeleteOutcome, DeleteOutcomeStatus, DeleteService};
