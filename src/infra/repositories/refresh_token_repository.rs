//! Refresh token repository contract and its SeaORM implementation.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use super::entities::refresh_token::{self, ActiveModel, Entity as RefreshTokenEntity};
use crate::domain::RefreshToken;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Refresh token repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist a new refresh token
    async fn create(&self, token: &RefreshToken) -> AppResult<()>;

    /// Find a refresh token by its secret; unknown secrets surface as
    /// `InvalidToken`.
    async fn find_by_token(&self, token: &str) -> AppResult<RefreshToken>;

    /// Find all refresh tokens for a user
    async fn find_by_user_id(&self, user_id: Uuid) -> AppResult<Vec<RefreshToken>>;

    /// Persist the revocation state of an existing token
    async fn update(&self, token: &RefreshToken) -> AppResult<()>;

    /// Atomically revoke a single live token.
    ///
    /// Returns whether this call performed the live -> revoked
    /// transition. Concurrent rotations of the same secret see `false`
    /// here and must take the reuse path.
    async fn revoke_by_token(&self, token: &str) -> AppResult<bool>;

    /// Revoke every live token in a family (reuse-detection sweep)
    async fn revoke_by_token_family(&self, token_family: Uuid) -> AppResult<()>;

    /// Revoke every live token of a user (logout)
    async fn revoke_by_user_id(&self, user_id: Uuid) -> AppResult<()>;

    /// Delete tokens past their expiry; returns the number removed
    async fn delete_expired(&self) -> AppResult<u64>;
}

/// Concrete SeaORM implementation of RefreshTokenRepository
pub struct RefreshTokenStore {
    db: DatabaseConnection,
}

impl RefreshTokenStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefreshTokenRepository for RefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> AppResult<()> {
        let active_model = ActiveModel {
            id: Set(token.id),
            user_id: Set(token.user_id),
            token: Set(token.token.clone()),
            token_family: Set(token.token_family),
            parent_token: Set(token.parent_token.clone()),
            issued_at: Set(token.issued_at),
            expires_at: Set(token.expires_at),
            is_revoked: Set(token.is_revoked),
            revoked_at: Set(token.revoked_at),
        };

        active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<RefreshToken> {
        let result = RefreshTokenEntity::find()
            .filter(refresh_token::Column::Token.eq(token))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        result.map(RefreshToken::from).ok_or(AppError::InvalidToken)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> AppResult<Vec<RefreshToken>> {
        let models = RefreshTokenEntity::find()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(RefreshToken::from).collect())
    }

    async fn update(&self, token: &RefreshToken) -> AppResult<()> {
        let active_model = ActiveModel {
            id: Set(token.id),
            user_id: Set(token.user_id),
            token: Set(token.token.clone()),
            token_family: Set(token.token_family),
            parent_token: Set(token.parent_token.clone()),
            issued_at: Set(token.issued_at),
            expires_at: Set(token.expires_at),
            is_revoked: Set(token.is_revoked),
            revoked_at: Set(token.revoked_at),
        };

        active_model.update(&self.db).await.map_err(AppError::from)?;
        Ok(())
    }

    async fn revoke_by_token(&self, token: &str) -> AppResult<bool> {
        // Conditional update: the WHERE clause only matches a live row,
        // so rows_affected tells us whether we won the rotation race.
        let result = RefreshTokenEntity::update_many()
            .col_expr(refresh_token::Column::IsRevoked, Expr::value(true))
            .col_expr(
                refresh_token::Column::RevokedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(refresh_token::Column::Token.eq(token))
            .filter(refresh_token::Column::IsRevoked.eq(false))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected > 0)
    }

    async fn revoke_by_token_family(&self, token_family: Uuid) -> AppResult<()> {
        RefreshTokenEntity::update_many()
            .col_expr(refresh_token::Column::IsRevoked, Expr::value(true))
            .col_expr(
                refresh_token::Column::RevokedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(refresh_token::Column::TokenFamily.eq(token_family))
            .filter(refresh_token::Column::IsRevoked.eq(false))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(())
    }

    async fn revoke_by_user_id(&self, user_id: Uuid) -> AppResult<()> {
        RefreshTokenEntity::update_many()
            .col_expr(refresh_token::Column::IsRevoked, Expr::value(true))
            .col_expr(
                refresh_token::Column::RevokedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::IsRevoked.eq(false))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(())
    }

    async fn delete_expired(&self) -> AppResult<u64> {
        let result = RefreshTokenEntity::delete_many()
            .filter(refresh_token::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }
}
