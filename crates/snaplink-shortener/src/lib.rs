//! URL registry: creation, owner edits, listings and analytics access.
//!
//! This crate provides [`UrlRegistry`], which allocates codes through the
//! generator crate, enforces ownership on every mutation and hands click
//! history to the analytics aggregator.

pub mod error;
pub mod service;
pub mod shortener;

pub use error::{Result, ShortenerError};
pub use service::UrlRegistry;
pub use shortener::{CreateParams, ExpirationPolicy, OwnerOverview, Shortener, UpdateParams};
