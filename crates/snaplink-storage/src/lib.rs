//! Storage backends implementing the Snaplink repository contract.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::{MySqlRepository, RetryPolicy};
pub use snaplink_core::repository::{ReadRepository, Repository};
pub use snaplink_core::StorageError;
