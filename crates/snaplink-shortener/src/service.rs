use crate::error::{Result, ShortenerError};
use crate::shortener::{CreateParams, ExpirationPolicy, OwnerOverview, Shortener, UpdateParams};
use async_trait::async_trait;
use jiff::Timestamp;
use snaplink_analytics::{AnalyticsAggregator, AnalyticsSummary};
use snaplink_core::{
    Clock, OwnerId, PasswordDigest, Repository, Requester, ShortCode, StorageError, SystemClock,
    UrlEntity, UrlPatch,
};
use snaplink_generator::{CodeAllocator, Generator};
use std::sync::Arc;
use tracing::{debug, info};

/// Default cap for the public listing.
pub const DEFAULT_PUBLIC_LIMIT: usize = 50;

const OVERVIEW_TOP_URLS: usize = 5;

/// Owns the lifecycle of URL entities.
///
/// This service wraps a `Repository` and a `Generator` to handle:
/// - Short code allocation (generated or custom)
/// - URL and expiration validation
/// - Ownership checks on every read of private data and every mutation
///
/// Code uniqueness is enforced by the repository's insert-if-absent. A
/// generated code that loses a creation race is replaced once with a fresh
/// one; a custom code that loses fails with `CodeAlreadyExists`.
pub struct UrlRegistry<R, G> {
    repository: Arc<R>,
    allocator: CodeAllocator<R, G>,
    clock: Arc<dyn Clock>,
    aggregator: AnalyticsAggregator,
    public_limit: usize,
}

impl<R: Repository, G: Generator> UrlRegistry<R, G> {
    /// Creates a new registry reading wall-clock time.
    pub fn new(repository: Arc<R>, generator: G) -> Self {
        Self::with_clock(repository, generator, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, generator: G, clock: Arc<dyn Clock>) -> Self {
        Self {
            allocator: CodeAllocator::builder()
                .repository(Arc::clone(&repository))
                .generator(generator)
                .build(),
            aggregator: AnalyticsAggregator::new(Arc::clone(&clock)),
            repository,
            clock,
            public_limit: DEFAULT_PUBLIC_LIMIT,
        }
    }

    /// Sets the listing cap used when `list_public` gets no explicit limit.
    pub fn with_public_limit(mut self, limit: usize) -> Self {
        self.public_limit = limit;
        self
    }

    /// Validates that the URL is absolute with an http(s) scheme and a host.
    fn validate_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(ShortenerError::InvalidUrl("URL cannot be empty".to_string()));
        }

        let parsed = url::Url::parse(url)
            .map_err(|e| ShortenerError::InvalidUrl(format!("{url}: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL scheme must be http or https: {}",
                parsed.scheme()
            )));
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(ShortenerError::InvalidUrl(format!("URL has no host: {url}")));
        }

        Ok(())
    }

    /// Loads `code` and checks that `requester` may manage it.
    async fn load_managed(&self, code: &ShortCode, requester: &Requester) -> Result<UrlEntity> {
        let entity = self
            .repository
            .get(code)
            .await?
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))?;

        if !requester.can_manage(&entity) {
            debug!(code = %code, requester = %requester.id, "ownership check failed");
            return Err(ShortenerError::Forbidden(code.to_string()));
        }

        Ok(entity)
    }
}

fn resolve_expiry(policy: ExpirationPolicy, now: Timestamp) -> Result<Option<Timestamp>> {
    match policy {
        ExpirationPolicy::Never => Ok(None),
        ExpirationPolicy::AfterDuration(duration) if duration.is_positive() => now
            .checked_add(duration)
            .map(Some)
            .map_err(|e| ShortenerError::InvalidExpiration(e.to_string())),
        ExpirationPolicy::AfterDuration(duration) => Err(ShortenerError::InvalidExpiration(
            format!("duration must be positive, got {duration:?}"),
        )),
        ExpirationPolicy::AtTimestamp(timestamp) => Ok(Some(timestamp)),
    }
}

/// Hashes off the async workers, Argon2 being deliberately slow.
async fn hash_password(password: Option<String>) -> Result<Option<PasswordDigest>> {
    let secret = match password {
        None => return Ok(None),
        Some(secret) if secret.is_empty() => return Ok(None),
        Some(secret) => secret,
    };

    let digest = tokio::task::spawn_blocking(move || PasswordDigest::hash(&secret))
        .await
        .map_err(|e| ShortenerError::PasswordHash(e.to_string()))??;
    Ok(Some(digest))
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for UrlRegistry<R, G> {
    async fn create(&self, params: CreateParams) -> Result<UrlEntity> {
        Self::validate_url(&params.long_url)?;

        let now = self.clock.now();
        let expires_at = resolve_expiry(params.expiration, now)?;
        let password = hash_password(params.password.clone()).await?;
        let custom = params.custom_code.as_deref().filter(|code| !code.is_empty());

        let mut retried = false;
        loop {
            let code = self.allocator.allocate(custom).await?;

            let entity = UrlEntity {
                code,
                long_url: params.long_url.clone(),
                title: params.title.clone(),
                description: params.description.clone(),
                owner_id: params.owner.clone(),
                created_at: now,
                updated_at: now,
                expires_at,
                is_active: true,
                is_public: params.is_public,
                password: password.clone(),
                click_count: 0,
                click_history: Default::default(),
                tags: params.tags.clone(),
            };

            match self.repository.insert(entity.clone()).await {
                Ok(()) => {
                    info!(code = %entity.code, owner = ?entity.owner_id, "created short url");
                    return Ok(entity);
                }
                Err(StorageError::Conflict(code)) if custom.is_none() && !retried => {
                    debug!(code = %code, "generated code lost a creation race, retrying");
                    retried = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn update(
        &self,
        code: &ShortCode,
        requester: &Requester,
        params: UpdateParams,
    ) -> Result<UrlEntity> {
        let managed = self.load_managed(code, requester).await?;

        if let Some(long_url) = &params.long_url {
            Self::validate_url(long_url)?;
        }

        let now = self.clock.now();
        let patch = UrlPatch {
            long_url: params.long_url,
            title: params.title,
            description: params.description,
            expires_at: params
                .expiration
                .map(|policy| resolve_expiry(policy, now))
                .transpose()?,
            password: match params.password {
                Some(password) => Some(hash_password(password).await?),
                None => None,
            },
            is_active: params.is_active,
            is_public: params.is_public,
            tags: params.tags,
            updated_at: Some(now),
        };

        let updated = self
            .repository
            .apply_patch(code, managed.owner_id.as_ref(), patch)
            .await?
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))?;

        debug!(code = %code, "updated short url");
        Ok(updated)
    }

    async fn delete(&self, code: &ShortCode, requester: &Requester) -> Result<()> {
        let managed = self.load_managed(code, requester).await?;

        // a code re-created for someone else since the check is left alone
        if !self
            .repository
            .delete(code, managed.owner_id.as_ref())
            .await?
        {
            return Err(ShortenerError::NotFound(code.to_string()));
        }

        info!(code = %code, requester = %requester.id, "deleted short url");
        Ok(())
    }

    async fn get(&self, code: &ShortCode, requester: &Requester) -> Result<UrlEntity> {
        self.load_managed(code, requester).await
    }

    async fn list_public(&self, limit: Option<usize>) -> Result<Vec<UrlEntity>> {
        Ok(self
            .repository
            .list_public(limit.unwrap_or(self.public_limit))
            .await?)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<UrlEntity>> {
        Ok(self.repository.list_by_owner(owner).await?)
    }

    async fn get_analytics(&self, code: &ShortCode) -> Result<AnalyticsSummary> {
        let entity = self
            .repository
            .get(code)
            .await?
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))?;

        Ok(self.aggregator.summarize(&entity))
    }

    async fn analytics_for(
        &self,
        code: &ShortCode,
        requester: &Requester,
    ) -> Result<AnalyticsSummary> {
        let entity = self.load_managed(code, requester).await?;
        Ok(self.aggregator.summarize(&entity))
    }

    async fn owner_overview(&self, owner: &OwnerId) -> Result<OwnerOverview> {
        let mut urls = self.repository.list_by_owner(owner).await?;

        let total_urls = urls.len();
        let total_clicks = urls.iter().map(|url| url.click_count).sum();

        // stable sort keeps newest-first among equal counts
        urls.sort_by(|a, b| b.click_count.cmp(&a.click_count));
        urls.truncate(OVERVIEW_TOP_URLS);

        Ok(OwnerOverview {
            total_urls,
            total_clicks,
            top_urls: urls,
        })
    }
}
