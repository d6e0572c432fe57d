use snaplink_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AllocationError>;

#[derive(Debug, Clone, Error)]
pub enum AllocationError {
    #[error("invalid code format: {0}")]
    InvalidCodeFormat(String),
    #[error("code is reserved: {0}")]
    ReservedCode(String),
    #[error("code already exists: {0}")]
    CodeAlreadyExists(String),
    #[error("no free code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
