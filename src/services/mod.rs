//! Application services layer - use cases and domain service contracts.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion; concrete repositories and crypto providers
//! are wired in at startup.

mod auth_service;
mod password_hasher;
mod token_service;
mod user_service;

pub use auth_service::{AuthService, Authenticator, TokenResponse};
pub use password_hasher::{Argon2PasswordHasher, PasswordHasher};
pub use token_service::{AccessTokenClaims, JwtTokenService, TokenService};
pub use user_service::{UserManager, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use password_hasher::MockPasswordHasher;
#[cfg(any(test, feature = "test-utils"))]
pub use token_service::MockTokenService;
