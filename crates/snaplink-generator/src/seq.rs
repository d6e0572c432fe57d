use crate::Generator;
use snaplink_core::shortcode::MAX_LENGTH;
use snaplink_core::{CoreError, ShortCode};
use std::sync::atomic::{AtomicU64, Ordering};

/// Longest accepted prefix: room is left for every digit of `u64::MAX`.
pub const MAX_PREFIX_LENGTH: usize = MAX_LENGTH - 20;

/// Produces sequential codes like "seq000000", "seq000001", ...
///
/// Unique within one instance. Useful where codes must be predictable, such
/// as tests and fixtures. Colliding with an existing code is still possible
/// when a custom code happens to match, so the allocator checks these too.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
            prefix: self.prefix.clone(),
        }
    }
}

impl SeqGenerator {
    /// Creates a generator with a custom prefix.
    ///
    /// The prefix must itself be a valid short code of at most
    /// [`MAX_PREFIX_LENGTH`] characters.
    pub fn with_prefix(prefix: impl Into<String>) -> Result<Self, CoreError> {
        Self::with_offset(prefix, 0)
    }

    /// Creates a generator starting from a specific counter value.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Result<Self, CoreError> {
        let prefix = ShortCode::new(prefix)?.to_string();
        if prefix.len() > MAX_PREFIX_LENGTH {
            return Err(CoreError::InvalidShortCode(format!(
                "prefix length must be at most {MAX_PREFIX_LENGTH}, got {}",
                prefix.len()
            )));
        }
        Ok(Self {
            counter: AtomicU64::new(offset),
            prefix,
        })
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortCode::new_unchecked(format!("{}{:06}", self.prefix, count))
    }
}
