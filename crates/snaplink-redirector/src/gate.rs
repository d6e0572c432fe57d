use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use snaplink_core::{Clock, ShortCode, SystemClock, UrlEntity};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Outcome of running the access gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Access granted; carries the target URL.
    Allowed(String),
    NotFound,
    Inactive,
    Expired,
    PasswordRequired,
    /// A wrong candidate was supplied. `attempts` counts the failures for
    /// this code in the current session, this one included.
    PasswordIncorrect { attempts: u32 },
}

impl Resolution {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Resolution::Allowed(_))
    }

    /// Short machine-readable reason, `"allowed"` for granted access.
    pub fn reason(&self) -> &'static str {
        match self {
            Resolution::Allowed(_) => "allowed",
            Resolution::NotFound => "not_found",
            Resolution::Inactive => "inactive",
            Resolution::Expired => "expired",
            Resolution::PasswordRequired => "password_required",
            Resolution::PasswordIncorrect { .. } => "password_incorrect",
        }
    }
}

/// Codes whose password this session has already presented correctly,
/// plus failed attempts per code.
///
/// Storing and restoring it across requests is the caller's business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrants {
    granted: HashSet<ShortCode>,
    #[serde(default)]
    failures: HashMap<ShortCode, u32>,
}

impl SessionGrants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_granted(&self, code: &ShortCode) -> bool {
        self.granted.contains(code)
    }

    pub fn grant(&mut self, code: ShortCode) {
        self.failures.remove(&code);
        self.granted.insert(code);
    }

    pub fn failed_attempts(&self, code: &ShortCode) -> u32 {
        self.failures.get(code).copied().unwrap_or(0)
    }

    fn record_failure(&mut self, code: &ShortCode) -> u32 {
        let attempts = self.failures.entry(code.clone()).or_insert(0);
        *attempts = attempts.saturating_add(1);
        *attempts
    }
}

impl FromIterator<ShortCode> for SessionGrants {
    fn from_iter<I: IntoIterator<Item = ShortCode>>(iter: I) -> Self {
        Self {
            granted: iter.into_iter().collect(),
            failures: HashMap::new(),
        }
    }
}

/// Decides whether a resolution request may proceed to a redirect.
///
/// Checks run in a fixed order and the first failing one wins: not found,
/// inactive, expired, password.
#[derive(Clone)]
pub struct AccessGate {
    clock: Arc<dyn Clock>,
}

impl AccessGate {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn check(
        &self,
        entity: Option<&UrlEntity>,
        grants: &mut SessionGrants,
        candidate: Option<&str>,
    ) -> Resolution {
        Self::check_at(entity, self.clock.now(), grants, candidate)
    }

    /// Runs the gate against an explicit instant.
    pub fn check_at(
        entity: Option<&UrlEntity>,
        now: Timestamp,
        grants: &mut SessionGrants,
        candidate: Option<&str>,
    ) -> Resolution {
        let Some(entity) = entity else {
            return Resolution::NotFound;
        };

        if !entity.is_active {
            return Resolution::Inactive;
        }

        if entity.is_expired_at(now) {
            return Resolution::Expired;
        }

        if let Some(digest) = &entity.password {
            if !grants.is_granted(&entity.code) {
                match candidate {
                    None => return Resolution::PasswordRequired,
                    Some(candidate) if digest.verify(candidate) => {
                        grants.grant(entity.code.clone());
                    }
                    Some(_) => {
                        let attempts = grants.record_failure(&entity.code);
                        return Resolution::PasswordIncorrect { attempts };
                    }
                }
            }
        }

        Resolution::Allowed(entity.long_url.clone())
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use snaplink_core::PasswordDigest;

    fn at(second: i64) -> Timestamp {
        Timestamp::from_second(second).unwrap()
    }

    fn entity(code: &str) -> UrlEntity {
        UrlEntity::builder()
            .code(ShortCode::new_unchecked(code))
            .long_url("https://example.com")
            .created_at(at(0))
            .updated_at(at(0))
            .build()
    }

    fn protected(code: &str, secret: &str) -> UrlEntity {
        let mut entity = entity(code);
        entity.password = Some(PasswordDigest::hash(secret).unwrap());
        entity
    }

    fn check(entity: Option<&UrlEntity>, now: i64, candidate: Option<&str>) -> Resolution {
        AccessGate::check_at(entity, at(now), &mut SessionGrants::new(), candidate)
    }

    #[test]
    fn missing_entity_is_not_found() {
        assert_eq!(check(None, 0, None), Resolution::NotFound);
    }

    #[test]
    fn plain_link_is_allowed() {
        let entity = entity("abc123");
        assert_eq!(
            check(Some(&entity), 10, None),
            Resolution::Allowed("https://example.com".to_string())
        );
    }

    #[test]
    fn inactive_wins_over_expired_and_password() {
        let mut entity = protected("abc123", "abc123");
        entity.is_active = false;
        entity.expires_at = Some(at(5));

        assert_eq!(check(Some(&entity), 100, None), Resolution::Inactive);
        assert_eq!(check(Some(&entity), 100, Some("abc123")), Resolution::Inactive);
    }

    #[test]
    fn expired_wins_over_password() {
        let mut entity = protected("abc123", "abc123");
        entity.expires_at = Some(at(5));

        assert_eq!(check(Some(&entity), 6, Some("abc123")), Resolution::Expired);
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let mut entity = entity("abc123");
        let expires_at = at(1_000);
        entity.expires_at = Some(expires_at);

        assert!(AccessGate::check_at(
            Some(&entity),
            expires_at,
            &mut SessionGrants::new(),
            None
        )
        .is_allowed());
        assert_eq!(
            AccessGate::check_at(
                Some(&entity),
                expires_at + SignedDuration::from_nanos(1),
                &mut SessionGrants::new(),
                None
            ),
            Resolution::Expired
        );
    }

    #[test]
    fn password_flow() {
        let entity = protected("abc123", "abc123");
        let mut grants = SessionGrants::new();
        let now = at(10);

        assert_eq!(
            AccessGate::check_at(Some(&entity), now, &mut grants, None),
            Resolution::PasswordRequired
        );
        assert_eq!(
            AccessGate::check_at(Some(&entity), now, &mut grants, Some("wrong")),
            Resolution::PasswordIncorrect { attempts: 1 }
        );
        assert_eq!(
            AccessGate::check_at(Some(&entity), now, &mut grants, Some("ABC123")),
            Resolution::PasswordIncorrect { attempts: 2 }
        );
        assert_eq!(grants.failed_attempts(&entity.code), 2);

        assert_eq!(
            AccessGate::check_at(Some(&entity), now, &mut grants, Some("abc123")),
            Resolution::Allowed("https://example.com".to_string())
        );
        assert!(grants.is_granted(&entity.code));
        assert_eq!(grants.failed_attempts(&entity.code), 0);

        // the grant carries over to later requests without a candidate
        assert!(AccessGate::check_at(Some(&entity), now, &mut grants, None).is_allowed());
    }

    #[test]
    fn grant_is_scoped_to_one_code() {
        let first = protected("first", "shared");
        let second = protected("second", "shared");
        let mut grants = SessionGrants::new();

        assert!(
            AccessGate::check_at(Some(&first), at(0), &mut grants, Some("shared")).is_allowed()
        );
        assert_eq!(
            AccessGate::check_at(Some(&second), at(0), &mut grants, None),
            Resolution::PasswordRequired
        );
    }

    #[test]
    fn granted_code_still_respects_deactivation() {
        let mut entity = protected("abc123", "abc123");
        let mut grants: SessionGrants = [entity.code.clone()].into_iter().collect();
        entity.is_active = false;

        assert_eq!(
            AccessGate::check_at(Some(&entity), at(0), &mut grants, None),
            Resolution::Inactive
        );
    }

    #[test]
    fn candidate_on_unprotected_link_is_ignored() {
        let entity = entity("abc123");
        assert!(check(Some(&entity), 0, Some("anything")).is_allowed());
    }

    #[test]
    fn gate_reads_the_clock() {
        let clock = snaplink_core::ManualClock::new(at(0));
        let gate = AccessGate::new(Arc::new(clock.clone()));
        let mut entity = entity("abc123");
        entity.expires_at = Some(at(60));

        assert!(gate.check(Some(&entity), &mut SessionGrants::new(), None).is_allowed());
        clock.advance(SignedDuration::from_secs(61));
        assert_eq!(
            gate.check(Some(&entity), &mut SessionGrants::new(), None),
            Resolution::Expired
        );
    }

    #[test]
    fn grants_survive_serialization() {
        let mut grants = SessionGrants::new();
        grants.grant(ShortCode::new_unchecked("abc123"));

        let json = serde_json::to_string(&grants).unwrap();
        let back: SessionGrants = serde_json::from_str(&json).unwrap();
        assert!(back.is_granted(&ShortCode::new_unchecked("abc123")));
    }

    #[test]
    fn reasons() {
        assert_eq!(Resolution::Allowed(String::new()).reason(), "allowed");
        assert_eq!(
            Resolution::PasswordIncorrect { attempts: 3 }.reason(),
            "password_incorrect"
        );
    }
}
