use crate::error::Result;
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use snaplink_analytics::AnalyticsSummary;
use snaplink_core::{OwnerId, Requester, ShortCode, UrlEntity};
use std::collections::BTreeSet;
use typed_builder::TypedBuilder;

/// Expiration policy for a shortened URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationPolicy {
    /// The shortened URL never expires.
    Never,
    /// The shortened URL expires after a certain duration.
    AfterDuration(SignedDuration),
    /// The shortened URL expires at a specific timestamp.
    AtTimestamp(Timestamp),
}

/// Everything a caller may specify when creating a link.
///
/// Empty `custom_code` and `password` strings count as absent.
#[derive(Debug, Clone, TypedBuilder)]
pub struct CreateParams {
    #[builder(setter(into))]
    pub long_url: String,
    /// `None` creates an anonymous link that only admins can manage.
    #[builder(default, setter(strip_option, into))]
    pub owner: Option<OwnerId>,
    #[builder(default, setter(strip_option, into))]
    pub custom_code: Option<String>,
    #[builder(default, setter(into))]
    pub title: String,
    #[builder(default, setter(into))]
    pub description: String,
    #[builder(default = ExpirationPolicy::Never)]
    pub expiration: ExpirationPolicy,
    #[builder(default, setter(strip_option, into))]
    pub password: Option<String>,
    #[builder(default)]
    pub is_public: bool,
    #[builder(default)]
    pub tags: BTreeSet<String>,
}

/// Owner edit. `None` leaves a field unchanged.
///
/// `expiration: Some(ExpirationPolicy::Never)` clears the expiry and
/// `password: Some(None)` (or an empty string) removes the password.
#[derive(Debug, Clone, Default)]
pub struct UpdateParams {
    pub long_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub expiration: Option<ExpirationPolicy>,
    pub password: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
    pub tags: Option<BTreeSet<String>>,
}

/// Dashboard numbers for one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerOverview {
    pub total_urls: usize,
    pub total_clicks: u64,
    /// Most clicked links first, at most five.
    pub top_urls: Vec<UrlEntity>,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a link and returns the stored entity.
    async fn create(&self, params: CreateParams) -> Result<UrlEntity>;

    /// Applies an owner edit. Only the owner or an admin may edit.
    async fn update(
        &self,
        code: &ShortCode,
        requester: &Requester,
        params: UpdateParams,
    ) -> Result<UrlEntity>;

    /// Hard-deletes a link, freeing its code.
    async fn delete(&self, code: &ShortCode, requester: &Requester) -> Result<()>;

    /// Returns a link's full record to its owner or an admin.
    async fn get(&self, code: &ShortCode, requester: &Requester) -> Result<UrlEntity>;

    /// Public, active links, newest first. `None` uses the configured default.
    async fn list_public(&self, limit: Option<usize>) -> Result<Vec<UrlEntity>>;

    /// All links of `owner`, newest first.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<UrlEntity>>;

    /// Analytics for any link, without an ownership check.
    async fn get_analytics(&self, code: &ShortCode) -> Result<AnalyticsSummary>;

    /// Analytics for a link the requester may manage.
    async fn analytics_for(
        &self,
        code: &ShortCode,
        requester: &Requester,
    ) -> Result<AnalyticsSummary>;

    async fn owner_overview(&self, owner: &OwnerId) -> Result<OwnerOverview>;
}
