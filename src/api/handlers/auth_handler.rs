//! Authentication handlers.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::TokenResponse;
use crate::types::MessageResponse;

/// User registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// User email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    /// User password (8-128 chars, mixed case plus a digit)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "SecurePass123", min_length = 8)]
    pub password: String,
    /// Requested roles. Recognized for compatibility but ignored:
    /// registration always assigns the default role, elevation is an
    /// administrative operation.
    #[serde(default)]
    #[schema(example = json!(["user"]))]
    pub roles: Option<Vec<String>>,
}

/// User login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// User email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    /// User password
    #[schema(example = "SecurePass123")]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    /// The refresh token obtained from login or a previous refresh
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Create authentication routes (public half)
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

/// Create authentication routes requiring a valid access token
pub fn auth_protected_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(profile))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = MessageResponse),
        (status = 400, description = "Invalid email or password policy violation"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state
        .auth_service
        .register(payload.email, payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("user registered successfully")),
    ))
}

/// Login and get an access/refresh credential pair
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "User account is inactive")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let tokens = state
        .auth_service
        .login(payload.email, payload.password)
        .await?;

    Ok(Json(tokens))
}

/// Rotate a refresh token into a fresh credential pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Authentication",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = TokenResponse),
        (status = 401, description = "Invalid, expired, or reused refresh token"),
        (status = 403, description = "User account is inactive")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshTokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let tokens = state.auth_service.refresh(payload.refresh_token).await?;

    Ok(Json(tokens))
}

/// Revoke all refresh tokens of the authenticated user
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<MessageResponse>> {
    state.auth_service.logout(current_user.id).await?;

    Ok(Json(MessageResponse::new("logged out successfully")))
}

/// Profile response built from validated claims
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: uuid::Uuid,
    pub email: String,
    pub roles: Vec<crate::domain::Role>,
}

/// Get the authenticated user's profile (from claims, no DB hit)
#[utoipa::path(
    get,
    path = "/auth/profile",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Authenticated principal", body = ProfileResponse),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn profile(
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<ProfileResponse>> {
    Ok(Json(ProfileResponse {
        id: current_user.id,
        email: current_user.email,
        roles: current_user.roles,
    }))
}
