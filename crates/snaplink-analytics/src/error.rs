use snaplink_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecordError>;

#[derive(Debug, Clone, Error)]
pub enum RecordError {
    /// The entity disappeared between resolution and recording.
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("failed to persist click: {0}")]
    Persistence(#[from] StorageError),
}
