mod callbacks;
mod error;
mod registry;
mod runner;

pub use callbacks::ExecutionCallbacks;
pub use error::ExecutionError;
pub use registry::TimerRegistry;
pub use runner::ExecutionRunner;
