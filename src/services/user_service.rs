//! User service - read-side user queries for authenticated surfaces.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::User;
use crate::errors::{AppError, AppResult};
use crate::infra::UserRepository;

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Get a user by ID
    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// List all users (admin surface)
    async fn list_users(&self) -> AppResult<Vec<User>>;
}

/// Concrete implementation of UserService.
pub struct UserManager {
    user_repo: Arc<dyn UserRepository>,
}

impl UserManager {
    /// Create a new user service instance
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.user_repo.find_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MockUserRepository;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_get_user_success() {
        let user = User::new("alice@example.com".to_string(), "hash".to_string());
        let user_id = user.id;

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .with(eq(user_id))
            .returning(move |_| Ok(Some(user.clone())));

        let service = UserManager::new(Arc::new(repo));
        let result = service.get_user(user_id).await.unwrap();
        assert_eq!(result.id, user_id);
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let service = UserManager::new(Arc::new(repo));
        let result = service.get_user(Uuid::new_v4()).await;
        assert!(matches!(result.unwrap_err(), AppError::UserNotFound));
    }

    #[tokio::test]
    async fn test_list_users() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_all().returning(|| {
            Ok(vec![
                User::new("a@example.com".to_string(), "hash".to_string()),
                User::new("b@example.com".to_string(), "hash".to_string()),
            ])
        });

        let service = UserManager::new(Arc::new(repo));
        assert_eq!(service.list_users().await.unwrap().len(), 2);
    }
}
