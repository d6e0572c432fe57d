//! Link passwords are stored as Argon2id PHC strings, never in plaintext.

use crate::error::CoreError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};

/// Hashed shared secret guarding a password-protected link.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Hashes a plaintext secret with a fresh random salt.
    pub fn hash(secret: &str) -> Result<Self, CoreError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|e| CoreError::PasswordHash(e.to_string()))
    }

    /// Wraps an existing PHC hash string, e.g. one read back from storage.
    pub fn from_phc(hash: impl Into<String>) -> Result<Self, CoreError> {
        let hash = hash.into();
        PasswordHash::new(&hash).map_err(|e| CoreError::PasswordHash(e.to_string()))?;
        Ok(Self(hash))
    }

    /// Checks a candidate secret. Comparison is exact and case-sensitive.
    pub fn verify(&self, candidate: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.0) else {
            return false;
        };

        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}
