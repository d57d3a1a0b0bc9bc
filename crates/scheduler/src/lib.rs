mod error;
mod maps;
mod scheduler;
mod window;

pub use error::SchedulerError;
pub use scheduler::Scheduler;
pub use window::{daily_utc_cron, is_within_window};
