//! Authentication service - registration, login, token rotation, logout.
//!
//! This is the security boundary of the system: it owns the password
//! verification pipeline, credential minting, and the refresh-token
//! rotation state machine with family-based reuse detection.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::TOKEN_TYPE_BEARER;
use crate::domain::{Email, Password, RefreshToken, User};
use crate::errors::{AppError, AppResult};
use crate::infra::{RefreshTokenRepository, UserRepository};
use crate::services::{AccessTokenClaims, PasswordHasher, TokenService};

/// Credential pair returned after successful authentication or refresh
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// Signed JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Opaque rotating refresh token
    pub refresh_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Access token expiration time in seconds
    #[schema(example = 900)]
    pub expires_in: i64,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user with the default role
    async fn register(&self, email: String, password: String) -> AppResult<()>;

    /// Login and return an access/refresh credential pair
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Rotate a refresh token into a fresh credential pair
    async fn refresh(&self, refresh_token: String) -> AppResult<TokenResponse>;

    /// Revoke every live refresh token of a user
    async fn logout(&self, user_id: Uuid) -> AppResult<()>;

    /// Verify an access token and extract its identity claims
    fn validate_token(&self, token: &str) -> AppResult<AccessTokenClaims>;
}

/// Concrete implementation of AuthService.
pub struct Authenticator {
    user_repo: Arc<dyn UserRepository>,
    refresh_token_repo: Arc<dyn RefreshTokenRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    token_service: Arc<dyn TokenService>,
}

impl Authenticator {
    /// Create a new auth service instance
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        refresh_token_repo: Arc<dyn RefreshTokenRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        token_service: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            user_repo,
            refresh_token_repo,
            password_hasher,
            token_service,
        }
    }

    /// Mint an access token and persist a successor refresh token.
    ///
    /// `token_family` is fresh for logins and inherited for rotations;
    /// `parent_token` records the rotation lineage (None on the root).
    async fn issue_credentials(
        &self,
        user: &User,
        token_family: Uuid,
        parent_token: Option<String>,
    ) -> AppResult<TokenResponse> {
        let access_token = self.token_service.generate_access_token(AccessTokenClaims {
            user_id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
        })?;

        let secret = self.token_service.generate_refresh_token()?;
        let expires_at = Utc::now() + self.token_service.refresh_token_expiry();

        let mut refresh_token = RefreshToken::new(user.id, secret.clone(), expires_at, token_family);
        refresh_token.parent_token = parent_token;

        self.refresh_token_repo.create(&refresh_token).await?;

        Ok(TokenResponse {
            access_token,
            refresh_token: secret,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.token_service.access_token_expiry().num_seconds(),
        })
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn register(&self, email: String, password: String) -> AppResult<()> {
        let email = Email::new(&email)?;

        if self.user_repo.exists_by_email(email.as_str()).await? {
            return Err(AppError::UserAlreadyExists);
        }

        let password = Password::new(&password)?;
        let password_hash = self.password_hasher.hash(password.as_str())?;

        let user = User::new(email.into_string(), password_hash);
        self.user_repo.create(&user).await
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        // Missing user and wrong password are indistinguishable to the
        // caller (no user enumeration).
        let mut user = self
            .user_repo
            .find_by_email(email.trim().to_lowercase().as_str())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        if !self
            .password_hasher
            .verify(&password, &user.password_hash)?
        {
            return Err(AppError::InvalidCredentials);
        }

        // Best-effort timestamp: a failed write must not fail the login
        user.update_last_login();
        if let Err(e) = self.user_repo.update(&user).await {
            tracing::warn!("Failed to update last login for user {}: {}", user.id, e);
        }

        self.issue_credentials(&user, Uuid::new_v4(), None).await
    }

    async fn refresh(&self, refresh_token: String) -> AppResult<TokenResponse> {
        let presented = self.refresh_token_repo.find_by_token(&refresh_token).await?;

        // A revoked token being presented again means replay of a rotated
        // secret, or a concurrent double-rotate. Either way the family is
        // treated as compromised and burned as a unit.
        if presented.is_revoked {
            self.refresh_token_repo
                .revoke_by_token_family(presented.token_family)
                .await?;
            return Err(AppError::TokenReuse);
        }

        if presented.is_expired() {
            return Err(AppError::ExpiredToken);
        }

        // Conditional revoke serializes concurrent rotations of the same
        // token: exactly one caller observes the live -> revoked edge.
        // The loser is routed to the reuse path.
        let rotated = self
            .refresh_token_repo
            .revoke_by_token(&presented.token)
            .await?;
        if !rotated {
            self.refresh_token_repo
                .revoke_by_token_family(presented.token_family)
                .await?;
            return Err(AppError::TokenReuse);
        }

        let user = self
            .user_repo
            .find_by_id(presented.user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        self.issue_credentials(&user, presented.token_family, Some(presented.token))
            .await
    }

    async fn logout(&self, user_id: Uuid) -> AppResult<()> {
        self.refresh_token_repo.revoke_by_user_id(user_id).await
    }

    fn validate_token(&self, token: &str) -> AppResult<AccessTokenClaims> {
        self.token_service.validate_access_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::infra::{MockRefreshTokenRepository, MockUserRepository};
    use crate::services::{MockPasswordHasher, MockTokenService};
    use chrono::Duration;
    use mockall::predicate::eq;

    fn test_user() -> User {
        User::new("alice@example.com".to_string(), "stored-hash".to_string())
    }

    fn live_token(user_id: Uuid) -> RefreshToken {
        RefreshToken::new(
            user_id,
            "secret-r1".to_string(),
            Utc::now() + Duration::days(7),
            Uuid::new_v4(),
        )
    }

    fn token_service_minting(secret: &'static str) -> MockTokenService {
        let mut tokens = MockTokenService::new();
        tokens
            .expect_generate_access_token()
            .returning(|_| Ok("signed-access".to_string()));
        tokens
            .expect_generate_refresh_token()
            .returning(move || Ok(secret.to_string()));
        tokens
            .expect_access_token_expiry()
            .returning(|| Duration::minutes(15));
        tokens
            .expect_refresh_token_expiry()
            .returning(|| Duration::days(7));
        tokens
    }

    fn authenticator(
        users: MockUserRepository,
        refresh_tokens: MockRefreshTokenRepository,
        hasher: MockPasswordHasher,
        tokens: MockTokenService,
    ) -> Authenticator {
        Authenticator::new(
            Arc::new(users),
            Arc::new(refresh_tokens),
            Arc::new(hasher),
            Arc::new(tokens),
        )
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let mut users = MockUserRepository::new();
        users
            .expect_exists_by_email()
            .with(eq("alice@example.com"))
            .returning(|_| Ok(true));

        let auth = authenticator(
            users,
            MockRefreshTokenRepository::new(),
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth
            .register("Alice@Example.com".to_string(), "P4ssword!".to_string())
            .await;
        assert!(matches!(result.unwrap_err(), AppError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_register_checks_email_before_password() {
        let auth = authenticator(
            MockUserRepository::new(),
            MockRefreshTokenRepository::new(),
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth
            .register("not-an-email".to_string(), "short".to_string())
            .await;
        assert!(matches!(result.unwrap_err(), AppError::InvalidEmail));
    }

    #[tokio::test]
    async fn test_register_hashes_and_persists() {
        let mut users = MockUserRepository::new();
        users.expect_exists_by_email().returning(|_| Ok(false));
        users
            .expect_create()
            .withf(|user: &User| {
                user.email == "alice@example.com"
                    && user.password_hash == "argon2-hash"
                    && user.roles == vec![Role::User]
                    && user.is_active
            })
            .returning(|_| Ok(()));

        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .with(eq("P4ssword!"))
            .returning(|_| Ok("argon2-hash".to_string()));

        let auth = authenticator(
            users,
            MockRefreshTokenRepository::new(),
            hasher,
            MockTokenService::new(),
        );

        auth.register("  Alice@Example.com ".to_string(), "P4ssword!".to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_invalid_credentials() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));

        let auth = authenticator(
            users,
            MockRefreshTokenRepository::new(),
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth
            .login("bob@example.com".to_string(), "Whatever1".to_string())
            .await;
        assert!(matches!(result.unwrap_err(), AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_invalid_credentials() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(test_user())));

        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| Ok(false));

        let auth = authenticator(
            users,
            MockRefreshTokenRepository::new(),
            hasher,
            MockTokenService::new(),
        );

        let result = auth
            .login("alice@example.com".to_string(), "Wr0ngPass".to_string())
            .await;
        assert!(matches!(result.unwrap_err(), AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_inactive_user_is_rejected() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| {
            let mut user = test_user();
            user.deactivate();
            Ok(Some(user))
        });

        let auth = authenticator(
            users,
            MockRefreshTokenRepository::new(),
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth
            .login("alice@example.com".to_string(), "P4ssword!".to_string())
            .await;
        assert!(matches!(result.unwrap_err(), AppError::UserInactive));
    }

    #[tokio::test]
    async fn test_login_survives_last_login_write_failure() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(test_user())));
        users
            .expect_update()
            .returning(|_| Err(AppError::internal("write failed")));

        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| Ok(true));

        let mut refresh_tokens = MockRefreshTokenRepository::new();
        refresh_tokens
            .expect_create()
            .withf(|token: &RefreshToken| token.parent_token.is_none() && !token.is_revoked)
            .returning(|_| Ok(()));

        let auth = authenticator(users, refresh_tokens, hasher, token_service_minting("r1"));

        let response = auth
            .login("alice@example.com".to_string(), "P4ssword!".to_string())
            .await
            .unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.refresh_token, "r1");
        assert_eq!(response.expires_in, 900);
    }

    #[tokio::test]
    async fn test_refresh_unknown_token_is_invalid() {
        let mut refresh_tokens = MockRefreshTokenRepository::new();
        refresh_tokens
            .expect_find_by_token()
            .returning(|_| Err(AppError::InvalidToken));

        let auth = authenticator(
            MockUserRepository::new(),
            refresh_tokens,
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth.refresh("unknown".to_string()).await;
        assert!(matches!(result.unwrap_err(), AppError::InvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_revoked_token_burns_family() {
        let family = Uuid::new_v4();
        let mut refresh_tokens = MockRefreshTokenRepository::new();
        refresh_tokens.expect_find_by_token().returning(move |_| {
            let mut token = live_token(Uuid::new_v4());
            token.token_family = family;
            token.revoke();
            Ok(token)
        });
        refresh_tokens
            .expect_revoke_by_token_family()
            .with(eq(family))
            .times(1)
            .returning(|_| Ok(()));

        let auth = authenticator(
            MockUserRepository::new(),
            refresh_tokens,
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth.refresh("secret-r1".to_string()).await;
        assert!(matches!(result.unwrap_err(), AppError::TokenReuse));
    }

    #[tokio::test]
    async fn test_refresh_expired_token_is_rejected_without_burn() {
        let mut refresh_tokens = MockRefreshTokenRepository::new();
        refresh_tokens.expect_find_by_token().returning(|_| {
            let mut token = live_token(Uuid::new_v4());
            token.expires_at = Utc::now() - Duration::minutes(1);
            Ok(token)
        });

        let auth = authenticator(
            MockUserRepository::new(),
            refresh_tokens,
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth.refresh("secret-r1".to_string()).await;
        assert!(matches!(result.unwrap_err(), AppError::ExpiredToken));
    }

    #[tokio::test]
    async fn test_refresh_rotates_within_family() {
        let user = test_user();
        let user_id = user.id;
        let family = Uuid::new_v4();

        let mut refresh_tokens = MockRefreshTokenRepository::new();
        refresh_tokens.expect_find_by_token().returning(move |_| {
            let mut token = live_token(user_id);
            token.token_family = family;
            Ok(token)
        });
        refresh_tokens
            .expect_revoke_by_token()
            .with(eq("secret-r1"))
            .returning(|_| Ok(true));
        refresh_tokens
            .expect_create()
            .withf(move |token: &RefreshToken| {
                token.token_family == family
                    && token.parent_token.as_deref() == Some("secret-r1")
                    && token.token == "secret-r2"
                    && !token.is_revoked
            })
            .returning(|_| Ok(()));

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .with(eq(user_id))
            .returning(move |_| Ok(Some(user.clone())));

        let auth = authenticator(
            users,
            refresh_tokens,
            MockPasswordHasher::new(),
            token_service_minting("secret-r2"),
        );

        let response = auth.refresh("secret-r1".to_string()).await.unwrap();
        assert_eq!(response.refresh_token, "secret-r2");
    }

    #[tokio::test]
    async fn test_refresh_lost_race_burns_family() {
        let family = Uuid::new_v4();
        let mut refresh_tokens = MockRefreshTokenRepository::new();
        refresh_tokens.expect_find_by_token().returning(move |_| {
            let mut token = live_token(Uuid::new_v4());
            token.token_family = family;
            Ok(token)
        });
        // Another rotation won the conditional update
        refresh_tokens
            .expect_revoke_by_token()
            .returning(|_| Ok(false));
        refresh_tokens
            .expect_revoke_by_token_family()
            .with(eq(family))
            .times(1)
            .returning(|_| Ok(()));

        let auth = authenticator(
            MockUserRepository::new(),
            refresh_tokens,
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth.refresh("secret-r1".to_string()).await;
        assert!(matches!(result.unwrap_err(), AppError::TokenReuse));
    }

    #[tokio::test]
    async fn test_refresh_for_missing_user() {
        let mut refresh_tokens = MockRefreshTokenRepository::new();
        refresh_tokens
            .expect_find_by_token()
            .returning(|_| Ok(live_token(Uuid::new_v4())));
        refresh_tokens
            .expect_revoke_by_token()
            .returning(|_| Ok(true));

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let auth = authenticator(
            users,
            refresh_tokens,
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth.refresh("secret-r1".to_string()).await;
        assert!(matches!(result.unwrap_err(), AppError::UserNotFound));
    }

    #[tokio::test]
    async fn test_refresh_inactive_user_is_rejected() {
        let mut refresh_tokens = MockRefreshTokenRepository::new();
        refresh_tokens
            .expect_find_by_token()
            .returning(|_| Ok(live_token(Uuid::new_v4())));
        refresh_tokens
            .expect_revoke_by_token()
            .returning(|_| Ok(true));

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| {
            let mut user = test_user();
            user.deactivate();
            Ok(Some(user))
        });

        let auth = authenticator(
            users,
            refresh_tokens,
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        let result = auth.refresh("secret-r1".to_string()).await;
        assert!(matches!(result.unwrap_err(), AppError::UserInactive));
    }

    #[tokio::test]
    async fn test_logout_revokes_all_user_tokens() {
        let user_id = Uuid::new_v4();
        let mut refresh_tokens = MockRefreshTokenRepository::new();
        refresh_tokens
            .expect_revoke_by_user_id()
            .with(eq(user_id))
            .times(1)
            .returning(|_| Ok(()));

        let auth = authenticator(
            MockUserRepository::new(),
            refresh_tokens,
            MockPasswordHasher::new(),
            MockTokenService::new(),
        );

        auth.logout(user_id).await.unwrap();
    }
}
