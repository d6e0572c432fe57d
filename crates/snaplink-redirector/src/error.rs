use snaplink_analytics::RecordError;
use snaplink_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedirectorError>;

#[derive(Debug, Clone, Error)]
pub enum RedirectorError {
    #[error("storage error: {0}")]
    Persistence(#[from] StorageError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("password verification task failed: {0}")]
    Verification(String),
}
