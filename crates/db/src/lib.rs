pub mod models;
pub mod repository;
pub mod memory;

pub use memory::InMemoryRepository;
pub use repository::{Repository, RepositoryError};
