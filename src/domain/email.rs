//! Email value object - normalized, shape-validated email address.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{AppError, AppResult};

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// Validated email address.
///
/// The stored value is always trimmed and lowercased; it is the form
/// persisted and queried everywhere else in the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    value: String,
}

impl Email {
    /// Create a new email value object with normalization and validation.
    pub fn new(input: &str) -> AppResult<Self> {
        let normalized = input.trim().to_lowercase();

        if normalized.is_empty() || !email_regex().is_match(&normalized) {
            return Err(AppError::InvalidEmail);
        }

        Ok(Self { value: normalized })
    }

    /// Get the normalized email string.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume and return the normalized email string.
    pub fn into_string(self) -> String {
        self.value
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
