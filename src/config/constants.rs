//! Application-wide constants
//!
//! Centralized location for magic values to improve maintainability.

// =============================================================================
// Authentication & Security
// =============================================================================

/// Default access token expiration in minutes
pub const DEFAULT_ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Default refresh token expiration in days
pub const DEFAULT_REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// Default JWT issuer claim
pub const DEFAULT_JWT_ISSUER: &str = "auth-service";

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Refresh token secret size in bytes (256 bits of entropy)
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// Token type identifier returned with credential pairs
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

// =============================================================================
// Password Policy
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length requirement
pub const MAX_PASSWORD_LENGTH: usize = 128;

// =============================================================================
// Server Configuration
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8080;

// =============================================================================
// Database
// =============================================================================

/// Default database host (for development)
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default database port
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default database user
pub const DEFAULT_DB_USER: &str = "postgres";

/// Default database password (for development)
pub const DEFAULT_DB_PASSWORD: &str = "postgres";

/// Default database name
pub const DEFAULT_DB_NAME: &str = "auth_db";

/// Default database SSL mode
pub const DEFAULT_DB_SSL_MODE: &str = "disable";
