//! RefreshToken domain entity - one record in a rotation chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rotating refresh-token record.
///
/// All tokens descended from one login share a `token_family`; the family
/// is the unit of revocation when reuse is detected. `parent_token` holds
/// the secret of the immediate predecessor (absent on the family root).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Opaque high-entropy secret, URL-safe base64; globally unique.
    pub token: String,
    pub token_family: Uuid,
    pub parent_token: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// Create a new, live refresh token.
    pub fn new(user_id: Uuid, token: String, expires_at: DateTime<Utc>, token_family: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            token_family,
            parent_token: None,
            issued_at: Utc::now(),
            expires_at,
            is_revoked: false,
            revoked_at: None,
        }
    }

    /// Check if the token has passed its expiry.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Check if the token is usable (neither expired nor revoked).
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked
    }

    /// Revoke the token. Revocation is terminal.
    pub fn revoke(&mut self) {
        self.is_revoked = true;
        self.revoked_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_token(expires_in: Duration) -> RefreshToken {
        RefreshToken::new(
            Uuid::new_v4(),
            "secret".to_string(),
            Utc::now() + expires_in,
            Uuid::new_v4(),
        )
    }

    #[test]
    fn test_new_token_is_valid() {
        let token = sample_token(Duration::days(7));
        assert!(token.is_valid());
        assert!(!token.is_revoked);
        assert!(token.parent_token.is_none());
        assert!(token.revoked_at.is_none());
    }

    #[test]
    fn test_expired_token_is_invalid_without_mutation() {
        let token = sample_token(Duration::seconds(-1));
        assert!(token.is_expired());
        assert!(!token.is_valid());
        // Expiry is intrinsic; the record itself is untouched
        assert!(!token.is_revoked);
    }

    #[test]
    fn test_revoke_sets_timestamp() {
        let mut token = sample_token(Duration::days(7));
        token.revoke();

        assert!(token.is_revoked);
        assert!(token.revoked_at.is_some());
        assert!(!token.is_valid());
    }
}
