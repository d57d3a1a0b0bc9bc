mod alerter;
mod error;
mod transport;

pub use alerter::Alerter;
pub use error::AlerterError;
pub use transport::{EmailTransport, LettreEmailTransport, NoopEmailTransport};
