//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections and migrations
//! - Repository implementations

pub mod db;
pub mod repositories;

pub use db::{Database, Migrator};
pub use repositories::{RefreshTokenRepository, RefreshTokenStore, UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{MockRefreshTokenRepository, MockUserRepository};
