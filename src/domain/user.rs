//! User domain entity - the identity aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Role;

/// User identity aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Normalized (trimmed, lowercased) email; unique across users.
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Non-empty, insertion-ordered role set.
    pub roles: Vec<Role>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active user with the default role.
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            roles: vec![Role::User],
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Check if the user holds a specific role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Check if the user may act at the required privilege level.
    ///
    /// Inactive users hold no permissions regardless of roles.
    pub fn has_permission(&self, required: Role) -> bool {
        self.is_active && self.roles.iter().any(|role| *role >= required)
    }

    /// Add a role if not already present.
    pub fn add_role(&mut self, role: Role) {
        if !self.has_role(role) {
            self.roles.push(role);
            self.updated_at = Utc::now();
        }
    }

    /// Remove a role if present.
    pub fn remove_role(&mut self, role: Role) {
        if let Some(pos) = self.roles.iter().position(|r| *r == role) {
            self.roles.remove(pos);
            self.updated_at = Utc::now();
        }
    }

    /// Record a successful login.
    pub fn update_last_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Deactivate the account; no new credentials may be issued.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// Reactivate the account.
    pub fn activate(&mut self) {
        self.is_active = true;
        self.updated_at = Utc::now();
    }
}

/// User response (safe to return to clients)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    /// Unique user identifier
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    /// User email address
    #[schema(example = "user@example.com")]
    pub email: String,
    /// User roles
    #[schema(example = json!(["user"]))]
    pub roles: Vec<Role>,
    /// Whether the account can authenticate
    pub is_active: bool,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            roles: user.roles,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
