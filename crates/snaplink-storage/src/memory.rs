use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use snaplink_core::repository::{ReadRepository, Repository, Result};
use snaplink_core::{ClickEvent, OwnerId, ShortCode, StorageError, UrlEntity, UrlPatch};
use std::cmp::Reverse;

/// In-memory implementation of the Repository trait using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking. Every write to one code runs under that
/// code's shard write guard, which makes insert-if-absent and click
/// recording atomic per entity.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    storage: DashMap<String, UrlEntity>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    fn collect_newest_first(&self, filter: impl Fn(&UrlEntity) -> bool) -> Vec<UrlEntity> {
        let mut entities: Vec<UrlEntity> = self
            .storage
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        entities.sort_by_key(|entity| (Reverse(entity.created_at), entity.code.clone()));
        entities
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlEntity>> {
        Ok(self
            .storage
            .get(code.as_str())
            .map(|entry| entry.value().clone()))
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.storage.contains_key(code.as_str()))
    }

    async fn list_public(&self, limit: usize) -> Result<Vec<UrlEntity>> {
        let mut entities = self.collect_newest_first(UrlEntity::is_listed);
        entities.truncate(limit);
        Ok(entities)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<UrlEntity>> {
        Ok(self.collect_newest_first(|entity| entity.owner_id.as_ref() == Some(owner)))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, entity: UrlEntity) -> Result<()> {
        match self.storage.entry(entity.code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(entity.code.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(entity);
                Ok(())
            }
        }
    }

    async fn apply_patch(
        &self,
        code: &ShortCode,
        expected_owner: Option<&OwnerId>,
        patch: UrlPatch,
    ) -> Result<Option<UrlEntity>> {
        let Some(mut entry) = self.storage.get_mut(code.as_str()) else {
            return Ok(None);
        };

        if entry.owner_id.as_ref() != expected_owner {
            return Ok(None);
        }

        entry.apply_patch(patch);
        Ok(Some(entry.clone()))
    }

    async fn record_click(&self, code: &ShortCode, event: ClickEvent) -> Result<Option<u64>> {
        Ok(self
            .storage
            .get_mut(code.as_str())
            .map(|mut entry| entry.record_click(event)))
    }

    async fn delete(&self, code: &ShortCode, expected_owner: Option<&OwnerId>) -> Result<bool> {
        Ok(self
            .storage
            .remove_if(code.as_str(), |_, entity| {
                entity.owner_id.as_ref() == expected_owner
            })
            .is_some())
    }
}
