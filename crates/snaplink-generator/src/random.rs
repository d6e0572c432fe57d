use crate::Generator;
use snaplink_core::ShortCode;

/// The URL-safe alphabet generated codes are drawn from.
pub const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const DEFAULT_LENGTH: usize = 8;

/// Draws fixed-length codes uniformly from [`ALPHABET`].
///
/// 64^8 possible codes; collisions are rare but not impossible, which is
/// why the allocator still checks every candidate.
#[derive(Debug, Clone, Copy)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self {
            length: DEFAULT_LENGTH,
        }
    }

    /// Lengths are clamped to `1..=MAX_LENGTH`.
    pub fn with_length(length: usize) -> Self {
        Self {
            length: length.clamp(1, snaplink_core::shortcode::MAX_LENGTH),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        let code: String = (0..self.length)
            .map(|_| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generates_eight_url_safe_chars_by_default() {
        let generator = RandomGenerator::new();

        for _ in 0..200 {
            let code = generator.generate();
            assert_eq!(code.as_str().len(), 8);
            assert!(ShortCode::new(code.as_str()).is_ok());
        }
    }

    #[test]
    fn codes_are_not_repeated_in_practice() {
        let generator = RandomGenerator::new();
        let codes: HashSet<String> = (0..1_000)
            .map(|_| generator.generate().to_string())
            .collect();
        assert_eq!(codes.len(), 1_000);
    }

    #[test]
    fn custom_length_is_clamped() {
        assert_eq!(RandomGenerator::with_length(0).length(), 1);
        assert_eq!(RandomGenerator::with_length(12).generate().as_str().len(), 12);
        assert_eq!(
            RandomGenerator::with_length(1_000).length(),
            snaplink_core::shortcode::MAX_LENGTH
        );
    }

    #[test]
    fn alphabet_has_no_duplicates() {
        let unique: HashSet<&u8> = ALPHABET.iter().collect();
        assert_eq!(unique.len(), ALPHABET.len());
    }
}
