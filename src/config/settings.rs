//! Application settings loaded from environment variables.

use std::env;

use chrono::Duration;

use super::constants::{
    DEFAULT_ACCESS_TOKEN_EXPIRY_MINUTES, DEFAULT_DB_HOST, DEFAULT_DB_NAME, DEFAULT_DB_PASSWORD,
    DEFAULT_DB_PORT, DEFAULT_DB_SSL_MODE, DEFAULT_DB_USER, DEFAULT_JWT_ISSUER,
    DEFAULT_REFRESH_TOKEN_EXPIRY_DAYS, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    MIN_JWT_SECRET_LENGTH,
};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    db_password: String,
    pub db_name: String,
    pub db_ssl_mode: String,
    jwt_secret_key: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
    pub jwt_issuer: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_user", &self.db_user)
            .field("db_password", &"[REDACTED]")
            .field("db_name", &self.db_name)
            .field("db_ssl_mode", &self.db_ssl_mode)
            .field("jwt_secret_key", &"[REDACTED]")
            .field("access_token_expiry_minutes", &self.access_token_expiry_minutes)
            .field("refresh_token_expiry_days", &self.refresh_token_expiry_days)
            .field("jwt_issuer", &self.jwt_issuer)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if JWT_SECRET_KEY is not set in release builds or is too
    /// short (security requirement).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret_key = env::var("JWT_SECRET_KEY").unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                // Development mode: use default but warn
                tracing::warn!("JWT_SECRET_KEY not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            } else {
                // Production mode: panic
                panic!("JWT_SECRET_KEY environment variable must be set in production");
            }
        });

        // Validate JWT secret length
        if jwt_secret_key.len() < MIN_JWT_SECRET_LENGTH {
            panic!(
                "JWT_SECRET_KEY must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        Self {
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            db_host: env::var("DB_HOST").unwrap_or_else(|_| DEFAULT_DB_HOST.to_string()),
            db_port: env::var("DB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DB_PORT),
            db_user: env::var("DB_USER").unwrap_or_else(|_| DEFAULT_DB_USER.to_string()),
            db_password: env::var("DB_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_DB_PASSWORD.to_string()),
            db_name: env::var("DB_NAME").unwrap_or_else(|_| DEFAULT_DB_NAME.to_string()),
            db_ssl_mode: env::var("DB_SSL_MODE")
                .unwrap_or_else(|_| DEFAULT_DB_SSL_MODE.to_string()),
            jwt_secret_key,
            access_token_expiry_minutes: env::var("JWT_ACCESS_TOKEN_EXPIRY_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRY_MINUTES),
            refresh_token_expiry_days: env::var("JWT_REFRESH_TOKEN_EXPIRY_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REFRESH_TOKEN_EXPIRY_DAYS),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_JWT_ISSUER.to_string()),
        }
    }

    /// Get the JWT secret for token signing/verification.
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret_key
    }

    /// Get the access token lifetime.
    pub fn access_token_expiry(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_minutes)
    }

    /// Get the refresh token lifetime.
    pub fn refresh_token_expiry(&self) -> Duration {
        Duration::days(self.refresh_token_expiry_days)
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Build the database connection URL from the individual parts.
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name,
            self.db_ssl_mode
        )
    }
}
