use snaplink_core::{CoreError, StorageError};
use snaplink_generator::AllocationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid code format: {0}")]
    InvalidCodeFormat(String),
    #[error("code already exists: {0}")]
    CodeAlreadyExists(String),
    #[error("no free code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("not allowed to manage {0}")]
    Forbidden(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("storage error: {0}")]
    Persistence(String),
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Conflict(code) => Self::CodeAlreadyExists(code),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<AllocationError> for ShortenerError {
    fn from(value: AllocationError) -> Self {
        match value {
            AllocationError::InvalidCodeFormat(code) => Self::InvalidCodeFormat(code),
            AllocationError::ReservedCode(code) => {
                Self::InvalidCodeFormat(format!("{code} is reserved"))
            }
            AllocationError::CodeAlreadyExists(code) => Self::CodeAlreadyExists(code),
            AllocationError::CodeSpaceExhausted { attempts } => {
                Self::CodeSpaceExhausted { attempts }
            }
            AllocationError::Storage(e) => e.into(),
        }
    }
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidCodeFormat(message),
            CoreError::PasswordHash(message) => Self::PasswordHash(message),
        }
    }
}
