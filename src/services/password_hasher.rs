//! Password hashing contract and its Argon2 implementation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString},
    Argon2, PasswordHasher as _,
};

use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Password hashing contract.
///
/// Implementations must use an adaptive, salted algorithm tuned for
/// interactive verification latency. The produced hash string is
/// self-describing (algorithm, parameters, salt), so `verify` needs no
/// side channel.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password.
    fn hash(&self, plaintext: &str) -> AppResult<String>;

    /// Verify a plaintext password against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch; `Err` only when the stored hash
    /// itself is unreadable.
    fn verify(&self, plaintext: &str, hash: &str) -> AppResult<bool>;
}

/// Argon2id implementation of [`PasswordHasher`].
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    /// Create a hasher with the library's default cost parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hash failed: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plaintext: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid hash format: {}", e)))?;
        Ok(self
            .argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash("S3curePassword").unwrap();

        assert!(hasher.verify("S3curePassword", &hash).unwrap());
        assert!(!hasher.verify("Wr0ngPassword", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = Argon2PasswordHasher::new();
        let hash1 = hasher.hash("SamePassword1").unwrap();
        let hash2 = hasher.hash("SamePassword1").unwrap();

        // Different salts produce different hashes
        assert_ne!(hash1, hash2);
        assert!(hasher.verify("SamePassword1", &hash1).unwrap());
        assert!(hasher.verify("SamePassword1", &hash2).unwrap());
    }

    #[test]
    fn test_hash_is_self_describing() {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash("S3curePassword").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let hasher = Argon2PasswordHasher::new();
        assert!(hasher.verify("S3curePassword", "not-a-phc-string").is_err());
    }
}
