use crate::click::{ClickEvent, ClickHistory};
use crate::password::PasswordDigest;
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use typed_builder::TypedBuilder;

/// Reference to the user owning a URL entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OwnerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// The authenticated caller of a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: OwnerId,
    pub role: Role,
}

impl Requester {
    pub fn user(id: impl Into<OwnerId>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
        }
    }

    pub fn admin(id: impl Into<OwnerId>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    /// Owners manage their own links; admins manage every link,
    /// including anonymous ones.
    pub fn can_manage(&self, entity: &UrlEntity) -> bool {
        self.role == Role::Admin || entity.owner_id.as_ref() == Some(&self.id)
    }
}

/// A stored short link together with its click counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct UrlEntity {
    pub code: ShortCode,
    #[builder(setter(into))]
    pub long_url: String,
    #[builder(default, setter(into))]
    pub title: String,
    #[builder(default, setter(into))]
    pub description: String,
    #[builder(default, setter(strip_option))]
    pub owner_id: Option<OwnerId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[builder(default)]
    pub expires_at: Option<Timestamp>,
    #[builder(default = true)]
    pub is_active: bool,
    #[builder(default)]
    pub is_public: bool,
    #[builder(default)]
    pub password: Option<PasswordDigest>,
    #[builder(default)]
    pub click_count: u64,
    #[builder(default)]
    pub click_history: ClickHistory,
    #[builder(default)]
    pub tags: BTreeSet<String>,
}

impl UrlEntity {
    /// Expired strictly after `expires_at`; the instant itself is still valid.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    pub fn is_accessible_at(&self, now: Timestamp) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    pub fn is_protected(&self) -> bool {
        self.password.is_some()
    }

    pub fn is_listed(&self) -> bool {
        self.is_public && self.is_active
    }

    /// Counts one access and appends it to the bounded history.
    ///
    /// Returns the new click count. Storage backends call this inside their
    /// per-entity atomic section.
    pub fn record_click(&mut self, event: ClickEvent) -> u64 {
        self.click_count += 1;
        self.click_history.push(event);
        self.click_count
    }

    /// Applies the fields present in `patch`. Click state is never touched.
    pub fn apply_patch(&mut self, patch: UrlPatch) {
        if let Some(long_url) = patch.long_url {
            self.long_url = long_url;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(expires_at) = patch.expires_at {
            self.expires_at = expires_at;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Partial update of the owner-editable fields of a [`UrlEntity`].
///
/// `None` leaves a field untouched. For nullable fields the inner `None`
/// clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlPatch {
    pub long_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub expires_at: Option<Option<Timestamp>>,
    pub password: Option<Option<PasswordDigest>>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
    pub tags: Option<BTreeSet<String>>,
    pub updated_at: Option<Timestamp>,
}

impl UrlPatch {
    /// True when the patch would change no owner-visible field.
    pub fn is_empty(&self) -> bool {
        self.long_url.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.expires_at.is_none()
            && self.password.is_none()
            && self.is_active.is_none()
            && self.is_public.is_none()
            && self.tags.is_none()
    }
}
