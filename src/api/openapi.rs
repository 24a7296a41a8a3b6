//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{admin_handler, auth_handler};
use crate::domain::{Role, UserResponse};
use crate::services::TokenResponse;
use crate::types::MessageResponse;

/// OpenAPI documentation for the auth service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Auth Service",
        version = "0.1.0",
        description = "Stateless identity and session service with rotating refresh tokens",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Authentication endpoints
        auth_handler::register,
        auth_handler::login,
        auth_handler::refresh,
        auth_handler::logout,
        auth_handler::profile,
        // Admin endpoints
        admin_handler::list_users,
    ),
    components(
        schemas(
            // Domain types
            Role,
            UserResponse,
            // Auth types
            auth_handler::RegisterRequest,
            auth_handler::LoginRequest,
            auth_handler::RefreshTokenRequest,
            auth_handler::ProfileResponse,
            TokenResponse,
            MessageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login, token rotation, logout"),
        (name = "Admin", description = "Administrative operations")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT access token obtained from /auth/login"))
                        .build(),
                ),
            );
        }
    }
}
