//! Token service contract and its JWT implementation.
//!
//! Access tokens are HS256-signed JWTs carrying identity and roles.
//! Refresh tokens are opaque 32-byte CSPRNG secrets, URL-safe base64
//! encoded; they are never interpreted, only matched against storage.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::REFRESH_TOKEN_BYTES;
use crate::domain::Role;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Identity claims carried by a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenClaims {
    pub user_id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

/// JWT claims payload
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: Uuid,
    email: String,
    roles: Vec<Role>,
    iat: i64,
    exp: i64,
    iss: String,
    sub: String,
}

/// Token issuing and validation contract.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait TokenService: Send + Sync {
    /// Generate a signed access token for the given identity claims.
    fn generate_access_token(&self, claims: AccessTokenClaims) -> AppResult<String>;

    /// Generate an opaque high-entropy refresh token secret.
    fn generate_refresh_token(&self) -> AppResult<String>;

    /// Verify signature and expiry of an access token and extract its
    /// identity claims.
    fn validate_access_token(&self, token: &str) -> AppResult<AccessTokenClaims>;

    /// Access token lifetime, fixed at construction.
    fn access_token_expiry(&self) -> Duration;

    /// Refresh token lifetime, fixed at construction.
    fn refresh_token_expiry(&self) -> Duration;
}

/// HMAC-SHA256 JWT implementation of [`TokenService`].
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: Duration,
    refresh_token_expiry: Duration,
    issuer: String,
}

impl JwtTokenService {
    /// Create a token service with a static symmetric key.
    pub fn new(
        secret: &str,
        access_token_expiry: Duration,
        refresh_token_expiry: Duration,
        issuer: String,
    ) -> Self {
        // Locking the validation to HS256 rejects tokens whose header
        // declares any other algorithm before the key is ever used.
        let validation = Validation::new(Algorithm::HS256);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_token_expiry,
            refresh_token_expiry,
            issuer,
        }
    }
}

impl TokenService for JwtTokenService {
    fn generate_access_token(&self, claims: AccessTokenClaims) -> AppResult<String> {
        let now = Utc::now();
        let expires_at = now + self.access_token_expiry;

        let jwt_claims = Claims {
            user_id: claims.user_id,
            email: claims.email,
            roles: claims.roles,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            sub: claims.user_id.to_string(),
        };

        encode(&Header::default(), &jwt_claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Token signing failed: {}", e)))
    }

    fn generate_refresh_token(&self) -> AppResult<String> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AppError::internal(format!("CSPRNG failure: {}", e)))?;
        Ok(URL_SAFE.encode(bytes))
    }

    fn validate_access_token(&self, token: &str) -> AppResult<AccessTokenClaims> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                    _ => AppError::InvalidToken,
                }
            })?;

        Ok(AccessTokenClaims {
            user_id: data.claims.user_id,
            email: data.claims.email,
            roles: data.claims.roles,
        })
    }

    fn access_token_expiry(&self) -> Duration {
        self.access_token_expiry
    }

    fn refresh_token_expiry(&self) -> Duration {
        self.refresh_token_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn service() -> JwtTokenService {
        JwtTokenService::new(
            "test-secret-key-minimum-32-chars!!!",
            Duration::minutes(15),
            Duration::days(7),
            "auth-service".to_string(),
        )
    }

    fn sample_claims() -> AccessTokenClaims {
        AccessTokenClaims {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            roles: vec![Role::User, Role::Moderator],
        }
    }

    #[test]
    fn test_generate_and_validate_round_trip() {
        let service = service();
        let claims = sample_claims();

        let token = service.generate_access_token(claims.clone()).unwrap();
        let validated = service.validate_access_token(&token).unwrap();

        assert_eq!(validated, claims);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = JwtTokenService::new(
            "test-secret-key-minimum-32-chars!!!",
            Duration::minutes(-5),
            Duration::days(7),
            "auth-service".to_string(),
        );

        let token = service.generate_access_token(sample_claims()).unwrap();
        assert!(matches!(
            service.validate_access_token(&token).unwrap_err(),
            AppError::ExpiredToken
        ));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let service = service();
        let other = JwtTokenService::new(
            "another-secret-key-minimum-32-chars",
            Duration::minutes(15),
            Duration::days(7),
            "auth-service".to_string(),
        );

        let token = other.generate_access_token(sample_claims()).unwrap();
        assert!(matches!(
            service.validate_access_token(&token).unwrap_err(),
            AppError::InvalidToken
        ));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let service = service();
        let mut token = service.generate_access_token(sample_claims()).unwrap();
        token.push('x');

        assert!(service.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_foreign_algorithm_header_is_rejected() {
        let service = service();
        let claims = Claims {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            roles: vec![Role::User],
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::minutes(15)).timestamp(),
            iss: "auth-service".to_string(),
            sub: Uuid::new_v4().to_string(),
        };

        // Same key, but the header declares HS384: the verifier must
        // refuse it without consulting the key.
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-minimum-32-chars!!!"),
        )
        .unwrap();

        assert!(matches!(
            service.validate_access_token(&token).unwrap_err(),
            AppError::InvalidToken
        ));
    }

    #[test]
    fn test_refresh_tokens_are_distinct() {
        let service = service();
        let tokens: HashSet<String> = (0..64)
            .map(|_| service.generate_refresh_token().unwrap())
            .collect();
        assert_eq!(tokens.len(), 64);
    }

    #[test]
    fn test_refresh_token_is_url_safe() {
        let service = service();
        let token = service.generate_refresh_token().unwrap();

        // 32 bytes of entropy, base64-encoded
        assert!(URL_SAFE.decode(&token).unwrap().len() == REFRESH_TOKEN_BYTES);
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
    }
}
