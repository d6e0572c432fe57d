use std::collections::BTreeSet;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use snaplink_core::UrlEntity;
use snaplink_shortener::{CreateParams, ExpirationPolicy, OwnerOverview, UpdateParams};

use crate::error::{AppError, Result};

/// Picks the expiration policy from the two mutually exclusive inputs.
fn expiration_policy(
    expire_after_hours: Option<i64>,
    expires_at: Option<Timestamp>,
) -> Result<Option<ExpirationPolicy>> {
    match (expire_after_hours, expires_at) {
        (Some(_), Some(_)) => Err(AppError::BadRequest(
            "expireAfter and expiresAt are mutually exclusive".to_string(),
        )),
        (Some(hours), None) => hours
            .checked_mul(3600)
            .map(|secs| Some(ExpirationPolicy::AfterDuration(SignedDuration::from_secs(secs))))
            .ok_or_else(|| AppError::BadRequest(format!("expireAfter out of range: {hours}"))),
        (None, Some(at)) => Ok(Some(ExpirationPolicy::AtTimestamp(at))),
        (None, None) => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUrlRequest {
    pub long_url: String,
    #[serde(default)]
    pub custom_code: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Hours until expiry.
    #[serde(default)]
    pub expire_after: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl CreateUrlRequest {
    pub fn into_params(self, owner: Option<snaplink_core::OwnerId>) -> Result<CreateParams> {
        let expiration = expiration_policy(self.expire_after, self.expires_at)?
            .unwrap_or(ExpirationPolicy::Never);

        Ok(CreateParams {
            long_url: self.long_url,
            owner,
            custom_code: self.custom_code,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            expiration,
            password: self.password,
            is_public: self.is_public,
            tags: self.tags,
        })
    }
}

/// Partial edit; absent fields stay unchanged.
///
/// `neverExpires: true` clears the expiry and an empty `password` removes
/// the password.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUrlRequest {
    #[serde(default)]
    pub long_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expire_after: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub never_expires: bool,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
}

impl UpdateUrlRequest {
    pub fn into_params(self) -> Result<UpdateParams> {
        let mut expiration = expiration_policy(self.expire_after, self.expires_at)?;
        if self.never_expires {
            if expiration.is_some() {
                return Err(AppError::BadRequest(
                    "neverExpires cannot be combined with an expiry".to_string(),
                ));
            }
            expiration = Some(ExpirationPolicy::Never);
        }

        Ok(UpdateParams {
            long_url: self.long_url,
            title: self.title,
            description: self.description,
            expiration,
            password: self
                .password
                .map(|password| Some(password).filter(|p| !p.is_empty())),
            is_active: self.is_active,
            is_public: self.is_public,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublicQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Full record as shown to the owner. The password digest never leaves
/// the server; `hasPassword` flags protected links.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResponse {
    pub code: String,
    pub short_url: String,
    pub long_url: String,
    pub title: String,
    pub description: String,
    pub owner_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub is_active: bool,
    pub is_public: bool,
    pub has_password: bool,
    pub click_count: u64,
    pub tags: BTreeSet<String>,
}

impl UrlResponse {
    pub fn from_entity(entity: UrlEntity, base_url: &str) -> Self {
        Self {
            short_url: entity.code.to_url(base_url),
            code: entity.code.to_string(),
            has_password: entity.is_protected(),
            long_url: entity.long_url,
            title: entity.title,
            description: entity.description,
            owner_id: entity.owner_id.map(|owner| owner.to_string()),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            expires_at: entity.expires_at,
            is_active: entity.is_active,
            is_public: entity.is_public,
            click_count: entity.click_count,
            tags: entity.tags,
        }
    }
}

/// Entry of the public listing; omits the owner and the target URL.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUrlResponse {
    pub code: String,
    pub short_url: String,
    pub title: String,
    pub description: String,
    pub created_at: Timestamp,
    pub click_count: u64,
    pub tags: BTreeSet<String>,
}

impl PublicUrlResponse {
    pub fn from_entity(entity: UrlEntity, base_url: &str) -> Self {
        Self {
            short_url: entity.code.to_url(base_url),
            code: entity.code.to_string(),
            title: entity.title,
            description: entity.description,
            created_at: entity.created_at,
            click_count: entity.click_count,
            tags: entity.tags,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub total_urls: usize,
    pub total_clicks: u64,
    pub top_urls: Vec<UrlResponse>,
}

impl OverviewResponse {
    pub fn from_overview(overview: OwnerOverview, base_url: &str) -> Self {
        Self {
            total_urls: overview.total_urls,
            total_clicks: overview.total_clicks,
            top_urls: overview
                .top_urls
                .into_iter()
                .map(|entity| UrlResponse::from_entity(entity, base_url))
                .collect(),
        }
    }
}
