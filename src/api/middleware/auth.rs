//! JWT authentication middleware and the RBAC gate.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::domain::Role;
use crate::errors::AppError;

/// Authenticated principal extracted from a validated access token.
///
/// Carried in request extensions as a typed value, so handlers never
/// touch raw claims.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

impl CurrentUser {
    /// Check if the principal may act at the required privilege level.
    pub fn can(&self, required: Role) -> bool {
        self.roles.iter().any(|role| *role >= required)
    }
}

/// JWT authentication middleware.
///
/// Extracts and validates the access token from the Authorization
/// header, then injects the CurrentUser into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .ok_or(AppError::Unauthorized)?;

    let claims = state.auth_service.validate_token(token)?;

    let current_user = CurrentUser {
        id: claims.user_id,
        email: claims.email,
        roles: claims.roles,
    };

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Require at least the given role, returns Forbidden otherwise.
pub fn require_role(user: &CurrentUser, required: Role) -> Result<(), AppError> {
    if user.can(required) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
