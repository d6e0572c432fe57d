use crate::click::ClickEvent;
use crate::entity::{OwnerId, UrlEntity, UrlPatch};
use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A read-only view of a repository.
///
/// Reads return snapshots; they never lock an entity against concurrent
/// click recording.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the entity for a given short code.
    /// Returns `None` if the code does not exist.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlEntity>>;

    /// Checks whether a short code is currently held by an entity.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Public and active entities, newest first, at most `limit` of them.
    async fn list_public(&self, limit: usize) -> Result<Vec<UrlEntity>>;

    /// Every entity owned by `owner`, newest first.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<UrlEntity>>;
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new entity keyed by its code.
    ///
    /// The existence check and the insert are one atomic step. Returns
    /// `Err(StorageError::Conflict)` if the code is already taken.
    async fn insert(&self, entity: UrlEntity) -> Result<()>;

    /// Applies an owner edit without touching click state.
    ///
    /// The edit lands only while the stored owner equals `expected_owner`,
    /// checked in the same atomic step as the write. Returns the updated
    /// entity, or `None` if the code does not exist or now belongs to
    /// someone else.
    async fn apply_patch(
        &self,
        code: &ShortCode,
        expected_owner: Option<&OwnerId>,
        patch: UrlPatch,
    ) -> Result<Option<UrlEntity>>;

    /// Atomically increments the click count and appends `event` to the
    /// bounded history. Returns the new click count, or `None` if the code
    /// does not exist.
    async fn record_click(&self, code: &ShortCode, event: ClickEvent) -> Result<Option<u64>>;

    /// Hard-deletes the entity for a given short code, freeing the code.
    ///
    /// Guarded by `expected_owner` like [`Repository::apply_patch`]. Returns
    /// `true` if a matching entity existed and was removed.
    async fn delete(&self, code: &ShortCode, expected_owner: Option<&OwnerId>) -> Result<bool>;
}
