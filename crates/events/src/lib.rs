mod bus;
mod event;

pub use bus::EventBus;
pub use event::{DomainEvent, Topic};
