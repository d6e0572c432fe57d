//! Short code generation and allocation.
//!
//! A [`Generator`] proposes candidate codes without looking at storage. The
//! [`CodeAllocator`] turns a caller-supplied custom code or a run of
//! generated candidates into a code that is free at the time of the check.
//! The final insert-if-absent is left to the storage layer.

pub mod allocator;
pub mod error;
pub mod random;
pub mod seq;

pub use allocator::CodeAllocator;
pub use error::{AllocationError, Result};
pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use snaplink_core::ShortCode;
use std::sync::Arc;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Every produced code must satisfy the short code character set.
pub trait Generator: Send + Sync + 'static {
    /// Proposes the next candidate code.
    fn generate(&self) -> ShortCode;
}

impl<G: Generator + ?Sized> Generator for Arc<G> {
    fn generate(&self) -> ShortCode {
        (**self).generate()
    }
}

impl Generator for Box<dyn Generator> {
    fn generate(&self) -> ShortCode {
        (**self).generate()
    }
}
