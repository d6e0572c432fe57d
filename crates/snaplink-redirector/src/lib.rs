//! Resolution of short codes behind the access gate.
//!
//! [`AccessGate`] decides whether a request may be redirected, checking in a
//! fixed order: not found, inactive, expired, then password. The
//! [`RedirectorService`] loads the entity, runs the gate and records the
//! click for allowed requests. Click recording failures never block a
//! redirect.

pub mod error;
pub mod gate;
pub mod redirector;
pub mod service;

pub use error::{RedirectorError, Result};
pub use gate::{AccessGate, Resolution, SessionGrants};
pub use redirector::Redirector;
pub use service::RedirectorService;
