//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and
//! infrastructure, wired once at startup.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Database, RefreshTokenStore, UserStore};
use crate::services::{
    Argon2PasswordHasher, AuthService, Authenticator, JwtTokenService, UserManager, UserService,
};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth_service: Arc<dyn AuthService>,
    /// User service
    pub user_service: Arc<dyn UserService>,
    /// Database connection
    pub database: Arc<Database>,
}

impl AppState {
    /// Create application state from a database connection and config.
    ///
    /// Wires the concrete repositories and crypto providers behind the
    /// service traits.
    pub fn from_config(database: Arc<Database>, config: &Config) -> Self {
        let user_repo = Arc::new(UserStore::new(database.get_connection()));
        let refresh_token_repo = Arc::new(RefreshTokenStore::new(database.get_connection()));
        let password_hasher = Arc::new(Argon2PasswordHasher::new());
        let token_service = Arc::new(JwtTokenService::new(
            config.jwt_secret(),
            config.access_token_expiry(),
            config.refresh_token_expiry(),
            config.jwt_issuer.clone(),
        ));

        let auth_service = Arc::new(Authenticator::new(
            user_repo.clone(),
            refresh_token_repo,
            password_hasher,
            token_service,
        ));
        let user_service = Arc::new(UserManager::new(user_repo));

        Self {
            auth_service,
            user_service,
            database,
        }
    }

    /// Create application state with manually injected services (tests).
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        user_service: Arc<dyn UserService>,
        database: Arc<Database>,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            database,
        }
    }
}
