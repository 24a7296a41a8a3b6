//! Password value object - policy-checked plaintext password.
//!
//! Holds the plaintext only long enough to reach the `PasswordHasher`
//! boundary; it never appears in Debug output or logs.

use crate::config::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use crate::errors::{AppError, AppResult};

/// Policy-validated password.
#[derive(Clone)]
pub struct Password {
    value: String,
}

// Don't expose the plaintext in debug output
impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Create a new password value object with policy validation.
    ///
    /// The policy requires 8-128 characters with at least one uppercase
    /// letter, one lowercase letter, and one digit (Unicode classes).
    pub fn new(plaintext: &str) -> AppResult<Self> {
        let length = plaintext.chars().count();

        if length < MIN_PASSWORD_LENGTH {
            return Err(AppError::invalid_password(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }

        if length > MAX_PASSWORD_LENGTH {
            return Err(AppError::invalid_password(format!(
                "Password must not exceed {} characters",
                MAX_PASSWORD_LENGTH
            )));
        }

        let has_upper = plaintext.chars().any(char::is_uppercase);
        let has_lower = plaintext.chars().any(char::is_lowercase);
        let has_digit = plaintext.chars().any(char::is_numeric);

        if !has_upper || !has_lower || !has_digit {
            return Err(AppError::invalid_password(
                "Password must contain at least one uppercase letter, \
                 one lowercase letter, and one digit",
            ));
        }

        Ok(Self {
            value: plaintext.to_string(),
        })
    }

    /// Get the plaintext for hashing. Only the `PasswordHasher` should
    /// call this.
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_password() {
        assert!(Password::new("P4ssword").is_ok());
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            Password::new("P4ss").unwrap_err(),
            AppError::InvalidPassword(_)
        ));
    }

    #[test]
    fn test_too_long() {
        let long = format!("P4ss{}", "a".repeat(130));
        assert!(Password::new(&long).is_err());
    }

    #[test]
    fn test_boundary_lengths() {
        // Exactly 8 and exactly 128 characters pass
        assert!(Password::new("P4ssword").is_ok());
        let max = format!("P4s{}", "a".repeat(125));
        assert_eq!(max.chars().count(), 128);
        assert!(Password::new(&max).is_ok());
    }

    #[test]
    fn test_missing_uppercase() {
        assert!(Password::new("p4ssword").is_err());
    }

    #[test]
    fn test_missing_lowercase() {
        assert!(Password::new("P4SSWORD").is_err());
    }

    #[test]
    fn test_missing_digit() {
        assert!(Password::new("Password").is_err());
    }

    #[test]
    fn test_unicode_letters_count() {
        // Unicode uppercase/lowercase satisfy the letter classes
        assert!(Password::new("Äbcdefg1").is_ok());
    }

    #[test]
    fn test_debug_redacts_plaintext() {
        let password = Password::new("S3cretPass").unwrap();
        let debug = format!("{:?}", password);
        assert!(!debug.contains("S3cretPass"));
        assert!(debug.contains("REDACTED"));
    }
}
