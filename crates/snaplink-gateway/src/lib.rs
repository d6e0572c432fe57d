//! HTTP surface of snaplink.
//!
//! Management routes live under `/api` and expect an upstream proxy to have
//! authenticated the caller (see [`extract::Caller`]). Short links resolve
//! at `/{code}`, with `/{code}/access` accepting a password for protected
//! links.

pub mod app;
pub mod cli;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use error::{AppError, Result};
pub use state::AppState;
