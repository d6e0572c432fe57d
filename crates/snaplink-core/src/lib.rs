//! Core types and traits for the Snaplink URL shortener.
//!
//! This crate provides the shared domain model (short codes, URL entities,
//! the bounded click history) together with the repository contract that
//! every storage backend implements.

pub mod click;
pub mod clock;
pub mod entity;
pub mod error;
pub mod password;
pub mod repository;
pub mod shortcode;

pub use click::{ClickContext, ClickEvent, ClickHistory, HISTORY_CAPACITY};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::{OwnerId, Requester, Role, UrlEntity, UrlPatch};
pub use error::{CoreError, StorageError};
pub use password::PasswordDigest;
pub use repository::{ReadRepository, Repository};
pub use shortcode::ShortCode;
