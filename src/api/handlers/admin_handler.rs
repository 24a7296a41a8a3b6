//! Admin handlers - user listing behind the admin role gate.

use axum::{extract::State, response::Json, routing::get, Extension, Router};

use crate::api::middleware::{require_role, CurrentUser};
use crate::api::AppState;
use crate::domain::{Role, UserResponse};
use crate::errors::AppResult;

/// Create admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users))
}

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<UserResponse>>> {
    require_role(&current_user, Role::Admin)?;

    let users = state.user_service.list_users().await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
