//! User repository contract and its SeaORM implementation.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, SqlErr,
};
use uuid::Uuid;

use super::entities::user::{self, roles_to_column, ActiveModel, Entity as UserEntity};
use crate::domain::User;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user; a unique-email conflict surfaces as
    /// `UserAlreadyExists`.
    async fn create(&self, user: &User) -> AppResult<()>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by normalized email
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Persist the current state of an existing user
    async fn update(&self, user: &User) -> AppResult<()>;

    /// Delete a user by ID
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Check whether a user exists with the given normalized email
    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;

    /// List all users
    async fn find_all(&self) -> AppResult<Vec<User>>;
}

/// Concrete SeaORM implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn to_active_model(user: &User) -> ActiveModel {
        ActiveModel {
            id: Set(user.id),
            email: Set(user.email.clone()),
            password_hash: Set(user.password_hash.clone()),
            roles: Set(roles_to_column(&user.roles)),
            is_active: Set(user.is_active),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
            last_login_at: Set(user.last_login_at),
        }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn create(&self, user: &User) -> AppResult<()> {
        Self::to_active_model(user)
            .insert(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::UserAlreadyExists,
                _ => AppError::from(e),
            })?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        Self::to_active_model(user)
            .update(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = UserEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::UserNotFound);
        }

        Ok(())
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let count = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(count > 0)
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(User::from).collect())
    }
}
