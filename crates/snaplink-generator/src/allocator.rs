use crate::error::{AllocationError, Result};
use crate::Generator;
use snaplink_core::{ReadRepository, ShortCode};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Codes that collide with fixed gateway paths.
pub const DEFAULT_RESERVED_CODES: [&str; 2] = ["api", "health"];

fn default_reserved() -> BTreeSet<String> {
    DEFAULT_RESERVED_CODES.iter().map(|c| c.to_string()).collect()
}

/// Proposes a short code that is free at the time of the check.
///
/// A custom code is trimmed, validated and checked once. Without one,
/// generated candidates are checked until a free one turns up or the retry
/// budget runs out. Allocation only proposes: a concurrent creator can still
/// take the code before the caller inserts it, which the storage layer
/// reports as a conflict.
///
/// Reserved codes are never handed out: a custom one is rejected and a
/// generated one counts as a collision.
#[derive(TypedBuilder)]
pub struct CodeAllocator<R, G> {
    repository: Arc<R>,
    generator: G,
    #[builder(default = DEFAULT_RETRY_BUDGET)]
    retry_budget: u32,
    #[builder(default = default_reserved())]
    reserved: BTreeSet<String>,
}

impl<R: ReadRepository, G: Generator> CodeAllocator<R, G> {
    /// Returns a free code, honoring `custom` when one is given.
    ///
    /// An empty `custom` counts as absent.
    pub async fn allocate(&self, custom: Option<&str>) -> Result<ShortCode> {
        match custom {
            Some(custom) if !custom.is_empty() => self.claim_custom(custom).await,
            _ => self.generate_free().await,
        }
    }

    async fn claim_custom(&self, custom: &str) -> Result<ShortCode> {
        let code = ShortCode::new(custom.trim())
            .map_err(|_| AllocationError::InvalidCodeFormat(custom.to_string()))?;

        if self.is_reserved(&code) {
            return Err(AllocationError::ReservedCode(code.to_string()));
        }

        if self.repository.exists(&code).await? {
            debug!(code = %code, "custom code already taken");
            return Err(AllocationError::CodeAlreadyExists(code.to_string()));
        }

        Ok(code)
    }

    fn is_reserved(&self, code: &ShortCode) -> bool {
        self.reserved.contains(code.as_str())
    }

    async fn generate_free(&self) -> Result<ShortCode> {
        for attempt in 1..=self.retry_budget {
            let candidate = self.generator.generate();

            if !self.is_reserved(&candidate) && !self.repository.exists(&candidate).await? {
                return Ok(candidate);
            }

            debug!(code = %candidate, attempt, "generated code collided");
        }

        warn!(attempts = self.retry_budget, "short code space exhausted");
        Err(AllocationError::CodeSpaceExhausted {
            attempts: self.retry_budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RandomGenerator, SeqGenerator};
    use jiff::Timestamp;
    use snaplink_core::{Repository, UrlEntity};
    use snaplink_storage::InMemoryRepository;

    /// Always proposes the same code.
    struct FixedGenerator(&'static str);

    impl Generator for FixedGenerator {
        fn generate(&self) -> ShortCode {
            ShortCode::new_unchecked(self.0)
        }
    }

    async fn seed(repo: &InMemoryRepository, code: &str) {
        let now = Timestamp::now();
        repo.insert(
            UrlEntity::builder()
                .code(ShortCode::new_unchecked(code))
                .long_url("https://example.com")
                .created_at(now)
                .updated_at(now)
                .build(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn generated_code_is_eight_url_safe_chars() {
        let allocator = CodeAllocator::builder()
            .repository(Arc::new(InMemoryRepository::new()))
            .generator(RandomGenerator::new())
            .build();

        let code = allocator.allocate(None).await.unwrap();
        assert_eq!(code.as_str().len(), 8);
        assert!(code
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[tokio::test]
    async fn custom_code_is_trimmed() {
        let allocator = CodeAllocator::builder()
            .repository(Arc::new(InMemoryRepository::new()))
            .generator(RandomGenerator::new())
            .build();

        let code = allocator.allocate(Some("  promo ")).await.unwrap();
        assert_eq!(code.as_str(), "promo");
    }

    #[tokio::test]
    async fn empty_custom_code_falls_back_to_generation() {
        let allocator = CodeAllocator::builder()
            .repository(Arc::new(InMemoryRepository::new()))
            .generator(SeqGenerator::with_prefix("sl").unwrap())
            .build();

        let code = allocator.allocate(Some("")).await.unwrap();
        assert_eq!(code.as_str(), "sl000000");
    }

    #[tokio::test]
    async fn invalid_custom_code_is_rejected() {
        let allocator = CodeAllocator::builder()
            .repository(Arc::new(InMemoryRepository::new()))
            .generator(RandomGenerator::new())
            .build();

        for bad in ["has space", "slash/", "ümlaut", "   "] {
            let err = allocator.allocate(Some(bad)).await.unwrap_err();
            assert!(
                matches!(err, AllocationError::InvalidCodeFormat(_)),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn taken_custom_code_is_rejected() {
        let repo = Arc::new(InMemoryRepository::new());
        seed(&repo, "promo").await;

        let allocator = CodeAllocator::builder()
            .repository(repo)
            .generator(RandomGenerator::new())
            .build();

        let err = allocator.allocate(Some("promo")).await.unwrap_err();
        assert!(matches!(err, AllocationError::CodeAlreadyExists(code) if code == "promo"));
    }

    #[tokio::test]
    async fn collisions_are_skipped() {
        let repo = Arc::new(InMemoryRepository::new());
        seed(&repo, "sl000000").await;
        seed(&repo, "sl000001").await;

        let allocator = CodeAllocator::builder()
            .repository(repo)
            .generator(SeqGenerator::with_prefix("sl").unwrap())
            .build();

        assert_eq!(allocator.allocate(None).await.unwrap().as_str(), "sl000002");
    }

    #[tokio::test]
    async fn exhausts_after_retry_budget() {
        let repo = Arc::new(InMemoryRepository::new());
        seed(&repo, "taken").await;

        let allocator = CodeAllocator::builder()
            .repository(repo)
            .generator(FixedGenerator("taken"))
            .build();

        let err = allocator.allocate(None).await.unwrap_err();
        assert!(matches!(
            err,
            AllocationError::CodeSpaceExhausted { attempts: 5 }
        ));
    }

    #[tokio::test]
    async fn retry_budget_is_configurable() {
        let repo = Arc::new(InMemoryRepository::new());
        seed(&repo, "taken").await;

        let allocator = CodeAllocator::builder()
            .repository(repo)
            .generator(FixedGenerator("taken"))
            .retry_budget(2)
            .build();

        let err = allocator.allocate(None).await.unwrap_err();
        assert!(matches!(
            err,
            AllocationError::CodeSpaceExhausted { attempts: 2 }
        ));
    }

    #[tokio::test]
    async fn route_names_are_reserved() {
        let allocator = CodeAllocator::builder()
            .repository(Arc::new(InMemoryRepository::new()))
            .generator(RandomGenerator::new())
            .build();

        for reserved in ["health", "api", " api "] {
            let err = allocator.allocate(Some(reserved)).await.unwrap_err();
            assert!(
                matches!(err, AllocationError::ReservedCode(_)),
                "{reserved:?} gave {err:?}"
            );
        }
        assert_eq!(allocator.allocate(Some("healthy")).await.unwrap().as_str(), "healthy");
    }

    #[tokio::test]
    async fn reserved_candidates_count_as_collisions() {
        let allocator = CodeAllocator::builder()
            .repository(Arc::new(InMemoryRepository::new()))
            .generator(FixedGenerator("health"))
            .retry_budget(3)
            .build();

        let err = allocator.allocate(None).await.unwrap_err();
        assert!(matches!(
            err,
            AllocationError::CodeSpaceExhausted { attempts: 3 }
        ));
    }

    #[tokio::test]
    async fn reserved_set_is_configurable() {
        let allocator = CodeAllocator::builder()
            .repository(Arc::new(InMemoryRepository::new()))
            .generator(RandomGenerator::new())
            .reserved(["admin".to_string()].into())
            .build();

        assert!(matches!(
            allocator.allocate(Some("admin")).await.unwrap_err(),
            AllocationError::ReservedCode(_)
        ));
        assert_eq!(allocator.allocate(Some("health")).await.unwrap().as_str(), "health");
    }
}
